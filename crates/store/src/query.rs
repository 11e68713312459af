use crate::Lesson;

/// A parsed lesson search.
///
/// Text matches case-insensitively as a substring of `topic` or `location`.
/// When the raw query parses as a number it additionally matches lessons whose
/// `price` or `space` equals that number exactly. An empty query matches
/// every lesson.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LessonSearch {
    /// Lower-cased, trimmed search text. Empty means "match everything".
    pub text: String,

    /// Numeric interpretation of the query, if it has one.
    pub number: Option<f64>,
}

impl LessonSearch {
    /// Creates a search that matches all lessons.
    pub fn all() -> Self {
        Self::default()
    }

    /// Parses a raw query string.
    pub fn parse(raw: &str) -> Self {
        let text = raw.trim().to_lowercase();
        let number = text.parse::<f64>().ok().filter(|n| n.is_finite());
        Self { text, number }
    }

    /// Returns true if this search matches every lesson.
    pub fn is_all(&self) -> bool {
        self.text.is_empty()
    }

    /// Checks a single lesson against the search.
    pub fn matches(&self, lesson: &Lesson) -> bool {
        if self.is_all() {
            return true;
        }
        if lesson.topic.to_lowercase().contains(&self.text)
            || lesson.location.to_lowercase().contains(&self.text)
        {
            return true;
        }
        match self.number {
            Some(n) => lesson.price == n || f64::from(lesson.space) == n,
            None => false,
        }
    }
}
