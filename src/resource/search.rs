//! Paginated scans for objects that have no direct lookup

use crmkit::backend::Backend;
use crmkit::{Client, Page};

/// Scan pages sequentially until `matches` accepts an item
///
/// Stops at the first match or at the first page shorter than the page
/// size. Page N+1 is requested only after page N has been checked.
pub fn find_first<T, F, M>(
    client: &Client,
    operation: &str,
    mut fetch: F,
    matches: M,
) -> crmkit::Result<Option<T>>
where
    F: FnMut(&dyn Backend, Page) -> crmkit::Result<Vec<T>>,
    M: Fn(&T) -> bool,
{
    let mut page = Page::default();
    loop {
        let items = client.call(operation, |api| fetch(api, page))?;
        let len = items.len();
        log::trace!("{operation}: page at offset {} returned {len} items", page.offset);

        if let Some(found) = items.into_iter().find(|item| matches(item)) {
            return Ok(Some(found));
        }
        if page.limit == 0 || len < page.limit as usize {
            return Ok(None);
        }
        page = page.next();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crmkit::{CreateTask, MockBackend};

    fn client_with_tasks(count: usize) -> (Client, MockBackend) {
        let mock = MockBackend::new();
        for i in 0..count {
            mock.create_task(&CreateTask {
                content: format!("task {i}"),
                format: "plaintext".into(),
                deadline_at: None,
                is_completed: false,
                linked_records: vec![],
                assignees: vec![],
            })
            .unwrap();
        }
        mock.reset_calls();
        (Client::with_backend(Box::new(mock.clone())), mock)
    }

    #[test]
    fn test_stops_at_first_match() {
        let (client, mock) = client_with_tasks(120);

        let found = find_first(
            &client,
            "list_tasks",
            |api, page| api.list_tasks(page),
            |t| t.content == "task 60",
        )
        .unwrap();

        assert_eq!(found.unwrap().content, "task 60");
        assert_eq!(mock.calls("list_tasks"), 2);
    }

    #[test]
    fn test_stops_at_short_page() {
        let (client, mock) = client_with_tasks(70);

        let found = find_first(
            &client,
            "list_tasks",
            |api, page| api.list_tasks(page),
            |t| t.content == "missing",
        )
        .unwrap();

        assert!(found.is_none());
        assert_eq!(mock.calls("list_tasks"), 2);
    }

    #[test]
    fn test_full_last_page_needs_one_more_request() {
        let (client, mock) = client_with_tasks(100);

        let found = find_first(
            &client,
            "list_tasks",
            |api, page| api.list_tasks(page),
            |_| false,
        )
        .unwrap();

        assert!(found.is_none());
        assert_eq!(mock.calls("list_tasks"), 3);
    }

    #[test]
    fn test_first_match_wins() {
        let (client, _) = client_with_tasks(3);

        let found = find_first(
            &client,
            "list_tasks",
            |api, page| api.list_tasks(page),
            |t| t.content.starts_with("task"),
        )
        .unwrap();

        assert_eq!(found.unwrap().content, "task 0");
    }
}
