//! The ordered project collection.

use crate::computed;
use crate::content::Project;
use chrono::{DateTime, Utc};

/// Build the `projects` collection for one build.
///
/// Items excluded by their computed fields are dropped. The rest start in
/// ascending (date, input path) order and are then stably sorted by
/// `position` with the **higher value first**, so equal positions stay in
/// date order.
///
/// The editor describes `position` as "a lower value pushes the position
/// up"; the descending sort is kept as published sites depend on it.
pub fn build_project_collection(items: &[Project]) -> Vec<&Project> {
    let mut collection: Vec<&Project> = items
        .iter()
        .filter(|p| !computed::resolve(p).exclude_from_collections)
        .collect();

    collection.sort_by(|a, b| {
        sort_date(a)
            .cmp(&sort_date(b))
            .then_with(|| a.input_path.cmp(&b.input_path))
    });
    collection.sort_by(|a, b| b.position.cmp(&a.position));
    collection
}

fn sort_date(p: &Project) -> DateTime<Utc> {
    p.date.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::Permalink;
    use chrono::TimeZone;
    use std::path::PathBuf;

    fn item(name: &str, position: i64, day: u32) -> Project {
        Project {
            title: name.into(),
            position,
            date: Some(Utc.with_ymd_and_hms(2023, 1, day, 0, 0, 0).unwrap()),
            input_path: PathBuf::from(format!("projects/{name}.md")),
            file_slug: name.into(),
            ..Default::default()
        }
    }

    fn titles(c: &[&Project]) -> Vec<String> {
        c.iter().map(|p| p.title.clone()).collect()
    }

    #[test]
    fn higher_position_sorts_first() {
        let items = vec![item("a", 5, 1), item("b", 10, 2), item("c", 1, 3)];
        assert_eq!(titles(&build_project_collection(&items)), vec!["b", "a", "c"]);
    }

    #[test]
    fn positions_order_descending() {
        let items = vec![item("p5", 5, 1), item("p10", 10, 2), item("p1", 1, 3), item("p999", 999, 4)];
        let positions: Vec<i64> = build_project_collection(&items)
            .iter()
            .map(|p| p.position)
            .collect();
        assert_eq!(positions, vec![999, 10, 5, 1]);
    }

    #[test]
    fn equal_positions_keep_date_order() {
        let items = vec![item("late", 999, 20), item("early", 999, 2), item("mid", 999, 10)];
        assert_eq!(
            titles(&build_project_collection(&items)),
            vec!["early", "mid", "late"]
        );
    }

    #[test]
    fn equal_dates_fall_back_to_input_path() {
        let items = vec![item("b", 0, 1), item("a", 0, 1)];
        assert_eq!(titles(&build_project_collection(&items)), vec!["a", "b"]);
    }

    #[test]
    fn hidden_items_are_dropped() {
        let mut draft = item("draft", 1, 1);
        draft.draft = true;
        let mut off = item("off", 1, 1);
        off.permalink = Permalink::Disabled;
        let mut excluded = item("excluded", 1, 1);
        excluded.exclude_from_collections = Some(true);
        let items = vec![draft, off, excluded, item("shown", 1, 1)];

        assert_eq!(titles(&build_project_collection(&items)), vec!["shown"]);
    }

    #[test]
    fn undated_items_sort_as_epoch() {
        let mut undated = item("undated", 3, 1);
        undated.date = None;
        let items = vec![item("dated", 3, 1), undated];
        assert_eq!(
            titles(&build_project_collection(&items)),
            vec!["undated", "dated"]
        );
    }

    #[test]
    fn empty_input_gives_empty_collection() {
        assert!(build_project_collection(&[]).is_empty());
    }
}
