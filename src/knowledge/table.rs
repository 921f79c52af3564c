//! Category → keyword → answer table
//!
//! Categories and keywords are stored lowercased; matching compares them
//! against lowercased questions. Ordered maps keep iteration (and therefore
//! first-hit matching) deterministic.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One (category, keyword) → answer association
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub category: String,
    pub keyword: String,
    pub answer: String,
}

impl KnowledgeEntry {
    /// Build a normalized entry, rejecting blank fields
    pub fn new(
        category: impl AsRef<str>,
        keyword: impl AsRef<str>,
        answer: impl AsRef<str>,
    ) -> Result<Self> {
        let category = category.as_ref().trim();
        let keyword = keyword.as_ref().trim();
        let answer = answer.as_ref().trim();

        if category.is_empty() {
            return Err(Error::InvalidArgument("category must not be empty".to_string()));
        }
        if keyword.is_empty() {
            return Err(Error::InvalidArgument("keyword must not be empty".to_string()));
        }
        if answer.is_empty() {
            return Err(Error::InvalidArgument("answer must not be empty".to_string()));
        }

        Ok(Self {
            category: category.to_lowercase(),
            keyword: keyword.to_lowercase(),
            answer: answer.to_string(),
        })
    }
}

/// Mapping from category name to keyword → answer
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnowledgeTable {
    categories: BTreeMap<String, BTreeMap<String, String>>,
}

impl KnowledgeTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite an entry, returning the previous answer if any
    pub fn insert(&mut self, entry: KnowledgeEntry) -> Option<String> {
        self.categories
            .entry(entry.category)
            .or_default()
            .insert(entry.keyword, entry.answer)
    }

    /// Look up the answer for a (category, keyword) pair
    pub fn get(&self, category: &str, keyword: &str) -> Option<&str> {
        self.categories
            .get(category)
            .and_then(|keywords| keywords.get(keyword))
            .map(String::as_str)
    }

    /// Whether the category already knows this keyword
    pub fn contains_keyword(&self, category: &str, keyword: &str) -> bool {
        self.get(category, keyword).is_some()
    }

    /// Category names in iteration order
    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    /// Keyword → answer pairs of one category
    pub fn keywords(&self, category: &str) -> impl Iterator<Item = (&str, &str)> {
        self.categories
            .get(category)
            .into_iter()
            .flat_map(|keywords| keywords.iter().map(|(k, a)| (k.as_str(), a.as_str())))
    }

    /// Every entry, grouped by category
    pub fn entries(&self) -> impl Iterator<Item = KnowledgeEntry> + '_ {
        self.categories.iter().flat_map(|(category, keywords)| {
            keywords.iter().map(move |(keyword, answer)| KnowledgeEntry {
                category: category.clone(),
                keyword: keyword.clone(),
                answer: answer.clone(),
            })
        })
    }

    /// Number of categories
    pub fn category_count(&self) -> usize {
        self.categories.len()
    }

    /// Total number of keywords across all categories
    pub fn keyword_count(&self) -> usize {
        self.categories.values().map(BTreeMap::len).sum()
    }

    /// Keyword count per category
    pub fn keyword_counts(&self) -> BTreeMap<String, usize> {
        self.categories
            .iter()
            .map(|(category, keywords)| (category.clone(), keywords.len()))
            .collect()
    }

    /// Check if the table holds no categories
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    /// Remove everything
    pub fn clear(&mut self) {
        self.categories.clear();
    }

    /// Upsert every entry of `other`, returning how many were written
    pub fn merge(&mut self, other: KnowledgeTable) -> usize {
        let mut merged = 0;
        for (category, keywords) in other.categories {
            let target = self.categories.entry(category).or_default();
            for (keyword, answer) in keywords {
                target.insert(keyword, answer);
                merged += 1;
            }
        }
        merged
    }

    /// The bundled school-subject table
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (category, keyword, answer) in BUILTIN_KNOWLEDGE {
            table
                .categories
                .entry(category.to_string())
                .or_default()
                .insert(keyword.to_string(), answer.to_string());
        }
        table
    }
}

impl FromIterator<KnowledgeEntry> for KnowledgeTable {
    fn from_iter<I: IntoIterator<Item = KnowledgeEntry>>(iter: I) -> Self {
        let mut table = Self::new();
        for entry in iter {
            table.insert(entry);
        }
        table
    }
}

const BUILTIN_KNOWLEDGE: &[(&str, &str, &str)] = &[
    ("математика", "уравнение", "Уравнение — это равенство с переменной. Решить уравнение — найти значение переменной."),
    ("математика", "алгебра", "Алгебра изучает операции над числами и переменными. Основные темы: уравнения, функции, системы."),
    ("математика", "геометрия", "Геометрия изучает пространственные фигуры. Важные формулы: площадь, периметр, объем."),
    ("математика", "дроби", "Дробь — часть целого. Сложение дробей: общий знаменатель."),
    ("математика", "проценты", "Процент — сотая часть числа. 1% = 1/100."),
    ("математика", "степень", "Степень показывает, сколько раз число умножается само на себя: aⁿ = a × a × ... × a (n раз)."),
    ("физика", "закон ньютона", "Первый: тело сохраняет движение, если нет сил. Второй: F=ma. Третий: действие равно противодействию."),
    ("физика", "электричество", "Электрический ток — движение зарядов. Закон Ома: I = U/R."),
    ("физика", "оптика", "Оптика изучает свет. Закон отражения: угол падения равен углу отражения."),
    ("физика", "механика", "Механика изучает движение. Скорость: v = s/t."),
    ("физика", "энергия", "Энергия не создается и не уничтожается, а превращается из одного вида в другой."),
    ("русский язык", "орфография", "Проверяй безударные гласные, непроизносимые согласные, правописание приставок."),
    ("русский язык", "пунктуация", "Запятые ставятся между однородными членами, в сложных предложениях, при обращениях."),
    ("русский язык", "сочинение", "План: введение (тезис), основная часть (аргументы), заключение (вывод)."),
    ("русский язык", "грамматика", "Изучает строение слов и предложений. Части речи: существительное, глагол, прилагательное..."),
    ("русский язык", "синтаксис", "Раздел грамматики, изучающий строение предложений."),
    ("английский язык", "времена", "Present Simple: регулярные действия. Past Simple: завершенные действия в прошлом."),
    ("английский язык", "глаголы", "To be: am/is/are/was/were. To have: have/has/had."),
    ("английский язык", "лексика", "Учи слова по темам: семья, школа, хобби, путешествия."),
    ("английский язык", "грамматика", "Артикли: a/an — неопределенные, the — определенный."),
    ("биология", "клетка", "Клетка — основная единица жизни. Состоит из ядра, цитоплазмы, мембраны."),
    ("биология", "растения", "Растения производят кислород через фотосинтез."),
    ("биология", "животные", "Классификация: млекопитающие, птицы, рыбы, рептилии, амфибии."),
    ("биология", "человек", "Системы организма: пищеварительная, дыхательная, кровеносная, нервная."),
    ("история", "древний мир", "Первые цивилизации: Месопотамия, Египет, Китай, Индия."),
    ("история", "средневековье", "Период с V по XV век. Рыцари, замки, феодализм."),
    ("история", "новая история", "Великие географические открытия, Возрождение, Просвещение."),
    ("история", "россия", "Киевская Русь, Московское царство, Российская империя, СССР, РФ."),
    ("общее", "привет", "Привет! Я Leo Assistant, твой помощник в учебе. Чем могу помочь?"),
    ("общее", "как дела", "У меня всё отлично! Готов помогать тебе с учебой. Как твои успехи?"),
    ("общее", "помоги", "Конечно! Расскажи, с каким предметом или заданием у тебя трудности."),
    ("общее", "спасибо", "Всегда пожалуйста! Обращайся, если будут ещё вопросы."),
    ("общее", "что ты умеешь", "Я могу: объяснять темы, помогать с заданиями, проверять знания, играть в обучающие игры!"),
    ("общее", "кто ты", "Я — Leo Assistant, помощник для учеников 7Б класса."),
];
