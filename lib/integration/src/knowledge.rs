//! In-process agricultural knowledge base.
//!
//! Search is a case-insensitive substring match of the whole query against
//! each item's title, tags and content. Items in the requested language and
//! in English are both eligible. Matches are ranked by where they hit
//! (title 3, tags 2, content 1) and the top five are returned.

use crate::error::SourceError;
use crate::source::{AuxiliarySource, DataSourceKind, SourceQuery};
use async_trait::async_trait;
use chrono::Utc;
use krishi_core::{Language, LanguageTable};
use rootcause::Report;
use serde::{Deserialize, Serialize};
use std::sync::{PoisonError, RwLock};
use tracing::debug;

/// Maximum number of search results.
pub const MAX_RESULTS: usize = 5;

/// Topic area of a knowledge item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KnowledgeCategory {
    CropManagement,
    PestControl,
    SoilHealth,
    WeatherPatterns,
    GovernmentSchemes,
    SeasonalCalendar,
}

impl KnowledgeCategory {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CropManagement => "crop-management",
            Self::PestControl => "pest-control",
            Self::SoilHealth => "soil-health",
            Self::WeatherPatterns => "weather-patterns",
            Self::GovernmentSchemes => "government-schemes",
            Self::SeasonalCalendar => "seasonal-calendar",
        }
    }
}

/// One article in the knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub id: String,
    pub title: String,
    pub content: String,
    pub category: KnowledgeCategory,
    pub tags: Vec<String>,
    pub language: Language,
}

/// An article to add; the id is assigned on insertion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewKnowledgeItem {
    pub title: String,
    pub content: String,
    pub category: KnowledgeCategory,
    pub tags: Vec<String>,
    pub language: Language,
}

impl KnowledgeItem {
    fn score(&self, lowered_query: &str) -> u32 {
        let mut score = 0;
        if self.title.to_lowercase().contains(lowered_query) {
            score += 3;
        }
        if self
            .tags
            .iter()
            .any(|tag| tag.to_lowercase().contains(lowered_query))
        {
            score += 2;
        }
        if self.content.to_lowercase().contains(lowered_query) {
            score += 1;
        }
        score
    }

    fn visible_in(&self, language: Language) -> bool {
        self.language == language || self.language == Language::En
    }
}

static POPULAR_TOPICS: LanguageTable<&[&str]> = LanguageTable::complete(
    &[
        "rice cultivation",
        "wheat farming",
        "pest control",
        "soil testing",
        "organic farming",
        "irrigation methods",
        "crop rotation",
        "fertilizer application",
        "government schemes",
        "kisan credit card",
        "weather patterns",
        "harvest timing",
    ],
    &[
        "चावल की खेती",
        "गेहूं की खेती",
        "कीट नियंत्रण",
        "मिट्टी परीक्षण",
        "जैविक खेती",
        "सिंचाई विधियां",
        "फसल चक्र",
        "उर्वरक प्रयोग",
        "सरकारी योजनाएं",
        "किसान क्रेडिट कार्ड",
        "मौसम पैटर्न",
        "फसल कटाई",
    ],
    &[
        "ಭತ್ತದ ಕೃಷಿ",
        "ಗೋಧಿ ಕೃಷಿ",
        "ಕೀಟ ನಿಯಂತ್ರಣ",
        "ಮಣ್ಣಿನ ಪರೀಕ್ಷೆ",
        "ಸಾವಯವ ಕೃಷಿ",
        "ನೀರಾವರಿ ವಿಧಾನಗಳು",
        "ಬೆಳೆ ಸರದಿ",
        "ಗೊಬ್ಬರ ಬಳಕೆ",
    ],
    &[
        "നെല്ല് കൃഷി",
        "ഗോതമ്പ് കൃഷി",
        "കീടനിയന്ത്രണം",
        "മണ്ണ് പരിശോധന",
        "ജൈവകൃഷി",
        "ജലസേചന രീതികൾ",
        "വിള ഭ്രമണം",
        "വളപ്രയോഗം",
    ],
);

static TITLES: LanguageTable<&str> = LanguageTable::complete(
    "Relevant Agricultural Knowledge",
    "संबंधित कृषि ज्ञान",
    "ಸಂಬಂಧಿತ ಕೃಷಿ ಜ್ಞಾನ",
    "പ്രസക്തമായ കാർഷിക അറിവ്",
);

/// Formats search results as a numbered block in `language`.
#[must_use]
pub fn format_knowledge(items: &[KnowledgeItem], language: Language) -> String {
    if items.is_empty() {
        return String::new();
    }
    let mut out = format!("{}:\n\n", TITLES.resolve(language));
    for (i, item) in items.iter().enumerate() {
        out.push_str(&format!("{}. {}\n{}\n\n", i + 1, item.title, item.content));
    }
    out
}

/// The article store.
#[derive(Debug)]
pub struct KnowledgeBase {
    items: RwLock<Vec<KnowledgeItem>>,
}

impl KnowledgeBase {
    /// Creates a knowledge base holding `items`.
    #[must_use]
    pub fn new(items: Vec<KnowledgeItem>) -> Self {
        Self {
            items: RwLock::new(items),
        }
    }

    /// Creates a knowledge base seeded with the built-in articles.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(builtin_items())
    }

    /// Searches for `query`, optionally within one category.
    #[must_use]
    pub fn search(
        &self,
        query: &str,
        language: Language,
        category: Option<KnowledgeCategory>,
    ) -> Vec<KnowledgeItem> {
        let lowered = query.trim().to_lowercase();
        if lowered.is_empty() {
            return Vec::new();
        }

        let items = self.items.read().unwrap_or_else(PoisonError::into_inner);
        let mut scored: Vec<(u32, &KnowledgeItem)> = items
            .iter()
            .filter(|item| item.visible_in(language))
            .filter(|item| category.is_none_or(|c| item.category == c))
            .map(|item| (item.score(&lowered), item))
            .filter(|(score, _)| *score > 0)
            .collect();
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        scored
            .into_iter()
            .take(MAX_RESULTS)
            .map(|(_, item)| item.clone())
            .collect()
    }

    /// Returns every article in `category` visible in `language`.
    #[must_use]
    pub fn by_category(&self, category: KnowledgeCategory, language: Language) -> Vec<KnowledgeItem> {
        self.items
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|item| item.category == category && item.visible_in(language))
            .cloned()
            .collect()
    }

    /// Adds an article and returns its id, `<category>-<unix millis>-<lang>`.
    pub fn add_item(&self, item: NewKnowledgeItem) -> String {
        let id = format!(
            "{}-{}-{}",
            item.category.as_str(),
            Utc::now().timestamp_millis(),
            item.language.code()
        );
        debug!(%id, "Added knowledge item");
        self.items
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(KnowledgeItem {
                id: id.clone(),
                title: item.title,
                content: item.content,
                category: item.category,
                tags: item.tags,
                language: item.language,
            });
        id
    }

    /// Returns suggested topics for `language`.
    #[must_use]
    pub fn popular_topics(language: Language) -> &'static [&'static str] {
        *POPULAR_TOPICS.resolve(language)
    }

    /// Returns the number of stored articles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for KnowledgeBase {
    fn default() -> Self {
        Self::builtin()
    }
}

#[async_trait]
impl AuxiliarySource for KnowledgeBase {
    fn kind(&self) -> DataSourceKind {
        DataSourceKind::Knowledge
    }

    async fn fetch_block(&self, query: &SourceQuery) -> Result<String, Report<SourceError>> {
        let results = self.search(&query.message, query.language, None);
        if results.is_empty() {
            return Err(SourceError::NoData {
                source: DataSourceKind::Knowledge,
            }
            .into());
        }
        Ok(format_knowledge(&results, query.language))
    }
}

fn item(
    id: &str,
    title: &str,
    content: &str,
    category: KnowledgeCategory,
    tags: &[&str],
    language: Language,
) -> KnowledgeItem {
    KnowledgeItem {
        id: id.to_string(),
        title: title.to_string(),
        content: content.to_string(),
        category,
        tags: tags.iter().map(|t| (*t).to_string()).collect(),
        language,
    }
}

fn builtin_items() -> Vec<KnowledgeItem> {
    use KnowledgeCategory::*;
    vec![
        item(
            "rice-cultivation-en",
            "Rice Cultivation Best Practices",
            "Paddy needs careful water management, good land preparation and timely operations.\n\
             1. Land preparation: plough two or three times and level the field\n\
             2. Seed: use certified seed treated with a fungicide\n\
             3. Transplanting: 21-day-old seedlings at 20x15 cm spacing\n\
             4. Water: keep 2-5 cm of standing water during vegetative growth\n\
             5. Nutrients: apply NPK according to the soil test\n\
             6. Pests: scout for stem borer, leaf folder and brown plant hopper\n\
             7. Harvest: when about 80% of the grains have turned golden\n\
             Sowing windows: Kharif (June-July), Rabi (November-December)",
            CropManagement,
            &["rice", "paddy", "water-management", "transplanting"],
            Language::En,
        ),
        item(
            "rice-cultivation-hi",
            "धान की खेती की उन्नत विधियां",
            "धान के लिए सही जल प्रबंधन, खेत की तैयारी और समय पर काम जरूरी है।\n\
             1. खेत की तैयारी: 2-3 बार जुताई करके समतल करें\n\
             2. बीज: प्रमाणित बीज लें और फफूंदनाशी से उपचारित करें\n\
             3. रोपाई: 21 दिन की पौध, 20x15 सेमी की दूरी पर\n\
             4. पानी: बढ़वार के समय 2-5 सेमी पानी भरा रखें\n\
             5. उर्वरक: मिट्टी जांच के अनुसार NPK दें\n\
             6. कीट: तना छेदक, पत्ती लपेटक और भूरे फुदके पर नजर रखें\n\
             7. कटाई: जब लगभग 80% दाने सुनहरे हो जाएं",
            CropManagement,
            &["धान", "चावल", "जल-प्रबंधन", "रोपाई"],
            Language::Hi,
        ),
        item(
            "wheat-cultivation-en",
            "Wheat Cultivation Guidelines",
            "Wheat is the main rabi cereal: it grows best in cool weather and ripens in warm weather.\n\
             1. Soil: well-drained loam, pH 6.0-7.5\n\
             2. Seed rate: 100-125 kg/ha irrigated, 75-100 kg/ha rainfed\n\
             3. Sowing: mid-November to mid-December, rows 20-23 cm apart\n\
             4. Irrigation: 4-6 waterings at crown root, tillering, jointing, flowering, milk and dough stages\n\
             5. Fertilizer: 120 kg N, 60 kg P2O5 and 40 kg K2O per hectare\n\
             6. Weeds: herbicide or hand weeding 30-35 days after sowing\n\
             Popular varieties: HD-2967, PBW-343, DBW-88",
            CropManagement,
            &["wheat", "rabi", "irrigation", "fertilizer"],
            Language::En,
        ),
        item(
            "aphid-control-en",
            "Aphid Control in Crops",
            "Aphids are small soft-bodied insects that suck sap and spread plant viruses.\n\
             Identification: 1-4 mm pear-shaped insects, green, black or red, clustered under \
             leaves and on shoot tips, leaving sticky honeydew.\n\
             Control:\n\
             1. Biological: encourage ladybird beetles, lacewings and parasitic wasps\n\
             2. Cultural: remove weeds and avoid excess nitrogen\n\
             3. Organic sprays: neem oil, insecticidal soap, garlic extract\n\
             4. Chemical, for severe infestation only: imidacloprid or thiamethoxam\n\
             Prevention: scout regularly and keep plant spacing open for air flow.",
            PestControl,
            &["aphid", "pest-control", "biological-control", "neem"],
            Language::En,
        ),
        item(
            "soil-testing-en",
            "Soil Testing and Health Management",
            "Test soil every 2-3 years, or before a major cropping season, to keep it fertile.\n\
             Parameters: pH (6.0-7.5 suits most crops), organic matter (at least 2-3%), \
             N, P and K, micronutrients (zinc, iron, manganese, boron) and electrical conductivity.\n\
             Improving soil health:\n\
             1. Add compost, farmyard manure or green manure\n\
             2. Rotate with legumes to fix nitrogen\n\
             3. Grow cover crops against erosion\n\
             4. Reduce tillage to protect structure\n\
             5. Fertilize according to the test report",
            SoilHealth,
            &["soil-testing", "ph", "organic-matter", "fertilization"],
            Language::En,
        ),
        item(
            "pm-kisan-en",
            "PM-KISAN Scheme Benefits",
            "Pradhan Mantri Kisan Samman Nidhi gives income support to landholding farmer families.\n\
             Benefit: Rs 6,000 a year, paid as three instalments of Rs 2,000 straight to the bank account.\n\
             Documents: Aadhaar card, bank account details, land records, mobile number.\n\
             Apply on pmkisan.gov.in through New Farmer Registration, and check status there \
             with the Aadhaar or mobile number.",
            GovernmentSchemes,
            &["pm-kisan", "subsidy", "income-support", "registration"],
            Language::En,
        ),
        item(
            "kisan-credit-card-hi",
            "किसान क्रेडिट कार्ड योजना",
            "किसान क्रेडिट कार्ड (KCC) खेती और उससे जुड़े कामों के लिए ऋण देता है।\n\
             पात्रता: व्यक्तिगत या संयुक्त किसान, काश्तकार, किरायेदार किसान और स्वयं सहायता समूह।\n\
             लाभ: 3 लाख रुपये तक बिना गारंटी, कम ब्याज दर, आसान चुकौती और बीमा सुरक्षा।\n\
             दस्तावेज: आधार, पैन, भूमि के कागजात, बैंक खाता और फोटो।\n\
             आवेदन: नजदीकी बैंक शाखा में संपर्क करें।",
            GovernmentSchemes,
            &["kcc", "ऋण", "किसान", "बैंक"],
            Language::Hi,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_ranks_title_over_tags_over_content() {
        let kb = KnowledgeBase::builtin();
        let results = kb.search("wheat", Language::En, None);

        assert_eq!(results[0].id, "wheat-cultivation-en");
        assert!(results.len() <= MAX_RESULTS);
    }

    #[test]
    fn search_is_case_insensitive_whole_query() {
        let kb = KnowledgeBase::builtin();

        let results = kb.search("NEEM OIL", Language::En, None);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "aphid-control-en");

        assert!(kb.search("My crops have pest infestation", Language::En, None).is_empty());
        assert!(kb.search("   ", Language::En, None).is_empty());
    }

    #[test]
    fn other_languages_see_their_items_and_english() {
        let kb = KnowledgeBase::builtin();

        let hi = kb.search("किसान", Language::Hi, None);
        assert!(hi.iter().any(|i| i.id == "kisan-credit-card-hi"));

        let en = kb.search("किसान", Language::En, None);
        assert!(en.is_empty());

        let kn = kb.search("rice", Language::Kn, None);
        assert_eq!(kn[0].id, "rice-cultivation-en");
    }

    #[test]
    fn category_filter_and_lookup() {
        let kb = KnowledgeBase::builtin();

        let pest = kb.search("a", Language::En, Some(KnowledgeCategory::PestControl));
        assert!(pest.iter().all(|i| i.category == KnowledgeCategory::PestControl));

        let schemes = kb.by_category(KnowledgeCategory::GovernmentSchemes, Language::Hi);
        assert_eq!(schemes.len(), 2);
        let schemes = kb.by_category(KnowledgeCategory::GovernmentSchemes, Language::En);
        assert_eq!(schemes.len(), 1);
    }

    #[test]
    fn added_items_are_searchable() {
        let kb = KnowledgeBase::new(Vec::new());
        assert!(kb.is_empty());

        let id = kb.add_item(NewKnowledgeItem {
            title: "Drip Irrigation".to_string(),
            content: "Saves water in banana and sugarcane.".to_string(),
            category: KnowledgeCategory::CropManagement,
            tags: vec!["drip".to_string()],
            language: Language::Ml,
        });

        assert!(id.starts_with("crop-management-"));
        assert!(id.ends_with("-ml"));
        assert_eq!(kb.search("drip", Language::Ml, None)[0].id, id);
        assert!(kb.search("drip", Language::En, None).is_empty());
    }

    #[test]
    fn block_lists_titles_and_content() {
        let kb = KnowledgeBase::builtin();
        let results = kb.search("neem", Language::En, None);
        let block = format_knowledge(&results, Language::En);

        assert!(block.starts_with("Relevant Agricultural Knowledge:\n\n1. Aphid Control in Crops\n"));
        assert_eq!(block, format_knowledge(&results, Language::En));
        assert_eq!(format_knowledge(&[], Language::En), "");
    }

    #[test]
    fn popular_topics_fall_back_to_english_only_when_missing() {
        assert_eq!(KnowledgeBase::popular_topics(Language::En)[0], "rice cultivation");
        assert_eq!(KnowledgeBase::popular_topics(Language::Ml).len(), 8);
    }

    #[tokio::test]
    async fn source_without_matches_reports_no_data() {
        let kb = KnowledgeBase::builtin();
        let err = kb
            .fetch_block(&SourceQuery::new(Language::En, "zzz"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no knowledge data"));

        let block = kb
            .fetch_block(&SourceQuery::new(Language::En, "aphid"))
            .await
            .expect("block");
        assert!(block.contains("Aphid Control"));
    }
}
