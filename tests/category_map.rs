use std::collections::BTreeMap;

use gradebook_merge::category::{CategoryDocument, CategoryEntry, CategoryIndexMap};
use gradebook_merge::classify::ColumnClassifier;
use gradebook_merge::model::CategoryId;

const CATEGORIES: [CategoryId; 6] = [
    CategoryId::Student,
    CategoryId::Quiz,
    CategoryId::Laboratory,
    CategoryId::Exams,
    CategoryId::Other,
    CategoryId::Custom(String::new()),
];

/// Small deterministic generator so operation sequences are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound.max(1)
    }

    fn category(&mut self) -> CategoryId {
        match self.next(CATEGORIES.len()) {
            5 => CategoryId::Custom("participation".into()),
            idx => CATEGORIES[idx].clone(),
        }
    }
}

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| name.to_string()).collect()
}

fn sorted_union(map: &CategoryIndexMap) -> Vec<usize> {
    let mut all: Vec<usize> = map
        .iter()
        .flat_map(|(_, indices)| indices.iter().copied())
        .collect();
    all.sort_unstable();
    all
}

#[test]
fn random_edit_sequences_preserve_the_partition() {
    for seed in 0..200u64 {
        let mut rng = Lcg(seed);
        let mut map = CategoryIndexMap::new();
        let mut column_count = 0usize;

        for _ in 0..60 {
            if column_count > 0 && rng.next(3) == 0 {
                let index = rng.next(column_count);
                map = map.remove_column(index);
                column_count -= 1;
            } else {
                let at = rng.next(column_count + 1);
                let category = rng.category();
                map = map.insert_column(&category, at);
                column_count += 1;
                assert_eq!(map.category_of(at), Some(&category));
            }

            map.check_partition(column_count)
                .unwrap_or_else(|err| panic!("seed {seed}: {err}"));
            assert_eq!(sorted_union(&map), (0..column_count).collect::<Vec<_>>());
        }
    }
}

#[test]
fn remove_undoes_insert() {
    for seed in 0..200u64 {
        let mut rng = Lcg(seed + 1_000);
        let mut map = CategoryIndexMap::new();
        let column_count = 1 + rng.next(12);
        for at in 0..column_count {
            map = map.insert_column(&rng.category(), at);
        }

        let category = rng.category();
        let at = rng.next(column_count + 1);
        let round_trip = map.insert_column(&category, at).remove_column(at);
        assert_eq!(round_trip, map, "seed {seed} inserting {category} at {at}");
    }
}

#[test]
fn insert_into_laboratory_shifts_quiz() {
    let map = CategoryIndexMap::from_indices([
        (CategoryId::Student, vec![0, 1, 2]),
        (CategoryId::Quiz, vec![3]),
        (CategoryId::Laboratory, vec![4]),
    ]);

    let next = map.insert_column(&CategoryId::Laboratory, 3);

    assert_eq!(next.indices(&CategoryId::Quiz), &[4]);
    assert_eq!(next.indices(&CategoryId::Laboratory), &[3, 5]);
    assert_eq!(next.indices(&CategoryId::Student), &[0, 1, 2]);
    assert_eq!(map.indices(&CategoryId::Quiz), &[3], "input map is untouched");
    next.check_partition(6).expect("partition holds");
}

#[test]
fn removing_an_unowned_index_only_rebases() {
    let map = CategoryIndexMap::from_indices([
        (CategoryId::Student, vec![0]),
        (CategoryId::Quiz, vec![2, 3]),
    ]);

    let next = map.remove_column(1);

    assert_eq!(next.indices(&CategoryId::Student), &[0]);
    assert_eq!(next.indices(&CategoryId::Quiz), &[1, 2]);
}

#[test]
fn stale_columns_are_dropped_and_reported_unassigned() {
    let sheet = headers(&["Name", "Quiz 1", "Lab 1", "Remarks"]);
    let mut categories = BTreeMap::new();
    categories.insert(CategoryId::Student, headers(&["Name"]));
    categories.insert(CategoryId::Quiz, headers(&["Quiz 1", "Quiz 2"]));

    let map = CategoryIndexMap::from_categorized_columns(&categories, &sheet);

    assert_eq!(map.indices(&CategoryId::Quiz), &[1]);
    assert_eq!(map.unassigned_columns(&sheet), vec![2, 3]);
    assert!(map.check_partition(sheet.len()).is_err());

    let complete = map.complete(&sheet, &ColumnClassifier::default());
    assert_eq!(complete.indices(&CategoryId::Laboratory), &[2]);
    assert_eq!(complete.indices(&CategoryId::Other), &[3]);
    complete
        .check_partition(sheet.len())
        .expect("completed map partitions the sheet");
}

#[test]
fn a_column_listed_twice_keeps_its_first_category() {
    let sheet = headers(&["Name", "Seatwork"]);
    let document = CategoryDocument {
        categories: vec![
            CategoryEntry {
                id: "student".into(),
                name: "Student Info".into(),
                columns: headers(&["Name"]),
            },
            CategoryEntry {
                id: "quiz".into(),
                name: "Quiz".into(),
                columns: headers(&["Seatwork"]),
            },
            CategoryEntry {
                id: "other".into(),
                name: "Other".into(),
                columns: headers(&["Seatwork"]),
            },
        ],
    };

    let map = document.to_index_map(&sheet);

    assert_eq!(map.indices(&CategoryId::Quiz), &[1]);
    assert!(map.indices(&CategoryId::Other).is_empty());
    map.check_partition(sheet.len()).expect("partition holds");
}

#[test]
fn persisted_document_lists_builtins_and_custom_categories() {
    let sheet = headers(&["Name", "Quiz 1", "Recitation"]);
    let map = CategoryIndexMap::from_indices([
        (CategoryId::Student, vec![0]),
        (CategoryId::Quiz, vec![1]),
        (CategoryId::Custom("recitation".into()), vec![2]),
    ]);

    let document = CategoryDocument::from_index_map(&map, &sheet);
    let ids: Vec<&str> = document
        .categories
        .iter()
        .map(|entry| entry.id.as_str())
        .collect();
    assert_eq!(
        ids,
        vec!["student", "quiz", "laboratory", "exams", "other", "recitation"]
    );
    assert_eq!(document.categories[0].name, "Student Info");

    let json = serde_json::to_value(&document).expect("document serialised");
    assert_eq!(json["categories"][1]["columns"], serde_json::json!(["Quiz 1"]));

    assert_eq!(document.to_index_map(&sheet), map);
}

#[test]
fn insertion_point_follows_the_category() {
    let map = CategoryIndexMap::from_indices([
        (CategoryId::Student, vec![0, 1]),
        (CategoryId::Quiz, vec![2, 3]),
        (CategoryId::Exams, vec![4]),
    ]);

    assert_eq!(map.insertion_point(&CategoryId::Quiz, 5), 4);
    assert_eq!(map.insertion_point(&CategoryId::Laboratory, 5), 5);
}
