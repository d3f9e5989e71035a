//! Month-by-month farming calendar.
//!
//! Months without an entry in the requested language use the English entry.

use crate::error::SourceError;
use crate::source::{AuxiliarySource, DataSourceKind, SourceQuery};
use crate::text::numbered;
use async_trait::async_trait;
use chrono::Datelike;
use krishi_core::{Language, LanguageTable};
use rootcause::Report;
use serde::Serialize;

/// Crops, work and risks for one month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthPlan {
    /// Month number, 1 for January.
    pub month: u32,
    /// Month name in the plan's language.
    pub name: &'static str,
    pub crops: &'static [&'static str],
    pub activities: &'static [&'static str],
    pub weather: &'static str,
    pub precautions: &'static [&'static str],
}

const ENGLISH_PLANS: &[MonthPlan] = &[
    MonthPlan {
        month: 1,
        name: "January",
        crops: &["Wheat", "Mustard", "Gram", "Pea", "Potato"],
        activities: &[
            "Irrigate wheat at crown root initiation",
            "Top-dress wheat with the second nitrogen dose",
            "Harvest mustard once pods turn brown",
            "Earth up and irrigate potato",
            "Prepare land for summer crops",
        ],
        weather: "Cold and dry with occasional frost",
        precautions: &["Protect crops from frost", "Keep fields well drained", "Watch for aphids"],
    },
    MonthPlan {
        month: 2,
        name: "February",
        crops: &["Wheat", "Barley", "Gram", "Mustard", "Sugarcane"],
        activities: &[
            "Irrigate wheat at tillering",
            "Harvest gram when pods mature",
            "Get fields ready for sugarcane planting",
            "Fertilize standing crops",
            "Raise nurseries for summer vegetables",
        ],
        weather: "Cool and pleasant, warming steadily",
        precautions: &[
            "Look out for late blight in potato",
            "Keep wheat free of weeds",
            "Plan irrigation for the summer",
        ],
    },
    MonthPlan {
        month: 3,
        name: "March",
        crops: &["Wheat", "Barley", "Sugarcane", "Summer vegetables"],
        activities: &[
            "Irrigate wheat at jointing",
            "Finish mustard and gram harvest",
            "Plant spring sugarcane",
            "Sow okra, bottle gourd and other summer vegetables",
            "Start land preparation for kharif",
        ],
        weather: "Warm days and cool nights",
        precautions: &[
            "Scout wheat for rust",
            "Secure water for summer crops",
            "Control termites in sugarcane",
        ],
    },
    MonthPlan {
        month: 4,
        name: "April",
        crops: &["Wheat", "Sugarcane", "Summer vegetables", "Fodder crops"],
        activities: &[
            "Harvest early wheat varieties",
            "Irrigate and fertilize sugarcane",
            "Pick summer vegetables regularly",
            "Sow fodder maize and sorghum",
        ],
        weather: "Hot and dry, temperatures rising",
        precautions: &[
            "Shield crops from heat stress",
            "Irrigate at short intervals",
            "Watch for pest build-up",
        ],
    },
    MonthPlan {
        month: 5,
        name: "May",
        crops: &["Sugarcane", "Summer vegetables", "Fodder crops"],
        activities: &[
            "Complete the wheat harvest",
            "Earth up and irrigate sugarcane",
            "Raise nurseries for kharif crops",
            "Deep-plough fields for kharif",
        ],
        weather: "Very hot and dry",
        precautions: &[
            "Conserve soil moisture with mulch",
            "Protect livestock and crops from heat waves",
            "Store harvested grain dry and sealed",
        ],
    },
    MonthPlan {
        month: 6,
        name: "June",
        crops: &["Rice", "Cotton", "Sugarcane", "Maize"],
        activities: &[
            "Prepare rice nurseries",
            "Sow cotton with pre-monsoon showers",
            "Sow maize",
            "Irrigate sugarcane and manage pests",
        ],
        weather: "Hot, with pre-monsoon showers",
        precautions: &[
            "Track the monsoon onset before sowing",
            "Keep seed and fertilizer stocked",
            "Clear drainage channels",
        ],
    },
    MonthPlan {
        month: 7,
        name: "July",
        crops: &["Rice", "Maize", "Cotton", "Soyabean", "Arhar", "Groundnut"],
        activities: &[
            "Transplant rice seedlings",
            "Sow soyabean, arhar and groundnut",
            "Gap-fill and thin maize and cotton",
            "Apply basal fertilizer after good rain",
        ],
        weather: "Monsoon rains, high humidity",
        precautions: &[
            "Drain standing water from non-rice fields",
            "Watch for stem borer in rice",
            "Avoid spraying just before rain",
        ],
    },
    MonthPlan {
        month: 8,
        name: "August",
        crops: &["Rice", "Maize", "Cotton", "Soyabean", "Sugarcane"],
        activities: &[
            "Top-dress rice with nitrogen",
            "Weed kharif crops",
            "Earth up maize",
            "Prop up sugarcane against lodging",
        ],
        weather: "Heavy monsoon rain with breaks",
        precautions: &[
            "Scout for leaf folder and brown plant hopper",
            "Watch cotton for sucking pests",
            "Prevent waterlogging",
        ],
    },
    MonthPlan {
        month: 9,
        name: "September",
        crops: &["Rice", "Cotton", "Soyabean", "Groundnut", "Vegetables"],
        activities: &[
            "Keep water in rice fields at flowering",
            "Harvest early maize and soyabean",
            "Pick first cotton flushes",
            "Sow early rabi vegetables",
        ],
        weather: "Monsoon withdrawing, humid",
        precautions: &[
            "Watch for blast and sheath blight in rice",
            "Dry harvested produce before storage",
            "Control pod borer in pulses",
        ],
    },
    MonthPlan {
        month: 10,
        name: "October",
        crops: &["Rice", "Cotton", "Mustard", "Gram", "Potato"],
        activities: &[
            "Harvest kharif rice",
            "Sow mustard and gram",
            "Plant potato",
            "Prepare fields for wheat",
        ],
        weather: "Clear skies, mild temperatures",
        precautions: &[
            "Manage crop residue without burning",
            "Treat rabi seed before sowing",
            "Use stored soil moisture for sowing",
        ],
    },
    MonthPlan {
        month: 11,
        name: "November",
        crops: &["Wheat", "Gram", "Mustard", "Potato", "Pea"],
        activities: &[
            "Sow wheat on time",
            "Give the first irrigation to mustard",
            "Earth up potato",
            "Finish cotton picking",
        ],
        weather: "Cool and dry",
        precautions: &[
            "Avoid late wheat sowing",
            "Watch for aphids in mustard",
            "Apply balanced fertilizer at sowing",
        ],
    },
    MonthPlan {
        month: 12,
        name: "December",
        crops: &["Wheat", "Gram", "Mustard", "Potato", "Sugarcane"],
        activities: &[
            "Irrigate wheat at crown root initiation",
            "Weed wheat and gram",
            "Harvest and crush sugarcane",
            "Cover nurseries against cold",
        ],
        weather: "Cold with fog and frost risk",
        precautions: &[
            "Irrigate lightly before frost nights",
            "Protect potato from late blight",
            "Keep livestock warm",
        ],
    },
];

const HINDI_PLANS: &[MonthPlan] = &[MonthPlan {
    month: 1,
    name: "जनवरी",
    crops: &["गेहूं", "सरसों", "चना", "मटर", "आलू"],
    activities: &[
        "गेहूं में शीर्ष जड़ बनने पर सिंचाई करें",
        "गेहूं में नाइट्रोजन की दूसरी खुराक दें",
        "फलियां भूरी होने पर सरसों काटें",
        "आलू में मिट्टी चढ़ाएं और सिंचाई करें",
        "गर्मी की फसलों के लिए खेत तैयार करें",
    ],
    weather: "ठंडा और सूखा, कभी-कभी पाला",
    precautions: &["फसलों को पाले से बचाएं", "जल निकासी ठीक रखें", "माहू की निगरानी करें"],
}];

static PLANS: LanguageTable<&[MonthPlan]> =
    LanguageTable::partial(ENGLISH_PLANS, Some(HINDI_PLANS), None, None);

struct SeasonalLabels {
    title: &'static str,
    crops: &'static str,
    activities: &'static str,
    weather: &'static str,
    precautions: &'static str,
}

static LABELS: LanguageTable<SeasonalLabels> = LanguageTable::partial(
    SeasonalLabels {
        title: "Seasonal Agricultural Calendar",
        crops: "Key Crops",
        activities: "Important Activities",
        weather: "Weather Conditions",
        precautions: "Precautions",
    },
    Some(SeasonalLabels {
        title: "मौसमी कृषि कैलेंडर",
        crops: "मुख्य फसलें",
        activities: "महत्वपूर्ण गतिविधियां",
        weather: "मौसम की स्थिति",
        precautions: "सावधानियां",
    }),
    None,
    None,
);

/// Returns the plan for `month` (1-12) in `language`, or in English when
/// that language has no entry for the month.
#[must_use]
pub fn month_plan(month: u32, language: Language) -> Option<&'static MonthPlan> {
    resolve_plan(month, language).map(|(plan, _)| plan)
}

/// Like [`month_plan`], also reporting the language the plan is written in.
fn resolve_plan(month: u32, language: Language) -> Option<(&'static MonthPlan, Language)> {
    let find = |plans: &'static [MonthPlan]| plans.iter().find(|p| p.month == month);
    PLANS
        .get(language)
        .and_then(|plans| find(*plans))
        .map(|plan| (plan, language))
        .or_else(|| find(*PLANS.resolve(Language::En)).map(|plan| (plan, Language::En)))
}

/// Looks a plan up by month name, case-insensitively. Names are matched in
/// the requested language first, then in English.
#[must_use]
pub fn month_plan_by_name(name: &str, language: Language) -> Option<&'static MonthPlan> {
    let wanted = name.trim().to_lowercase();
    let find = |plans: &'static [MonthPlan]| plans.iter().find(|p| p.name.to_lowercase() == wanted);
    PLANS
        .get(language)
        .and_then(|plans| find(*plans))
        .or_else(|| find(*PLANS.resolve(Language::En)))
        .and_then(|plan| month_plan(plan.month, language))
}

/// Formats a plan as a block with headings in `language`.
#[must_use]
pub fn format_month_plan(plan: &MonthPlan, language: Language) -> String {
    let t = LABELS.resolve(language);
    format!(
        "{} - {}\n\n{}: {}\n\n{}:\n{}\n\n{}: {}\n\n{}:\n{}\n",
        t.title,
        plan.name,
        t.crops,
        plan.crops.join(", "),
        t.activities,
        numbered(plan.activities),
        t.weather,
        plan.weather,
        t.precautions,
        numbered(plan.precautions),
    )
}

/// Calendar source; reads the month of the query's request time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeasonalCalendar;

impl SeasonalCalendar {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuxiliarySource for SeasonalCalendar {
    fn kind(&self) -> DataSourceKind {
        DataSourceKind::Seasonal
    }

    async fn fetch_block(&self, query: &SourceQuery) -> Result<String, Report<SourceError>> {
        let (plan, block_language) = resolve_plan(query.requested_at.month(), query.language)
            .ok_or(SourceError::NoData {
                source: DataSourceKind::Seasonal,
            })?;
        Ok(format_month_plan(plan, block_language))
    }
}
