//! Seed catalog loaded into an empty `lessons` collection.

use store::NewLesson;

/// Seats each seeded lesson starts with.
pub const DEFAULT_SPACE: u32 = 5;

/// The ten starter lessons.
pub fn default_lessons() -> Vec<NewLesson> {
    [
        ("Mathematics", "H101", 50.0),
        ("Physics", "A203", 60.0),
        ("Chemistry", "C205", 55.0),
        ("Biology", "B301", 45.0),
        ("Computer Science", "F405", 65.0),
        ("English Literature", "A102", 40.0),
        ("History", "D204", 45.0),
        ("Geography", "A303", 50.0),
        ("Art", "C401", 55.0),
        ("Music", "F100", 60.0),
    ]
    .into_iter()
    .map(|(topic, location, price)| NewLesson::new(topic, location, price, DEFAULT_SPACE))
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_has_ten_bookable_lessons() {
        let lessons = default_lessons();
        assert_eq!(lessons.len(), 10);
        assert!(lessons.iter().all(|l| l.space == DEFAULT_SPACE && l.price >= 0.0));
        assert_eq!(lessons[4].topic, "Computer Science");
    }
}
