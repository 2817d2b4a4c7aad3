use crate::domain::model::{AggregatedBook, BestsellerEntry};
use std::collections::BTreeMap;

/// 依 ISBN-13 彙總多週、多榜單的紀錄。
///
/// 沒有 ISBN 的紀錄無法歸戶，直接略過。文字欄位取抓取順序中第一個非空值，
/// 輸出依 ISBN 排序。
pub fn aggregate_by_isbn(entries: &[BestsellerEntry]) -> Vec<AggregatedBook> {
    let mut groups: BTreeMap<&str, AggregatedBook> = BTreeMap::new();

    for entry in entries {
        let Some(isbn) = entry.primary_isbn13.as_deref() else {
            continue;
        };

        match groups.get_mut(isbn) {
            Some(book) => {
                book.best_rank = book.best_rank.min(entry.rank);
                book.max_weeks_on_list = book.max_weeks_on_list.max(entry.weeks_on_list);
                book.latest_bestseller_date = book.latest_bestseller_date.max(entry.bestseller_date);
                fill_first(&mut book.publisher, &entry.publisher);
                fill_first(&mut book.description, &entry.description);
                fill_first(&mut book.title, &entry.title);
                fill_first(&mut book.author, &entry.author);
            }
            None => {
                groups.insert(
                    isbn,
                    AggregatedBook {
                        primary_isbn13: isbn.to_string(),
                        best_rank: entry.rank,
                        max_weeks_on_list: entry.weeks_on_list,
                        publisher: entry.publisher.clone(),
                        description: entry.description.clone(),
                        title: entry.title.clone(),
                        author: entry.author.clone(),
                        latest_bestseller_date: entry.bestseller_date,
                        review: None,
                    },
                );
            }
        }
    }

    groups.into_values().collect()
}

fn fill_first(slot: &mut Option<String>, candidate: &Option<String>) {
    if slot.is_none() {
        slot.clone_from(candidate);
    }
}
