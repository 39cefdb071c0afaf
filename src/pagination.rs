use serde::Serialize;
use utoipa::ToSchema;

pub const DEFAULT_PER_PAGE: u64 = 15;
pub const MAX_PER_PAGE: u64 = 50;

/// Clamp a client-requested page size to [1, MAX_PER_PAGE].
pub fn clamp_per_page(requested: Option<u64>) -> u64 {
    requested.unwrap_or(DEFAULT_PER_PAGE).clamp(1, MAX_PER_PAGE)
}

pub fn requested_page(requested: Option<u64>) -> u64 {
    requested.unwrap_or(1).max(1)
}

#[derive(Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct PageMeta {
    pub current_page: u64,
    pub last_page: u64,
    pub per_page: u64,
    pub total: u64,
    /// 1-based index of the first item on this page; null when the page is empty.
    pub from: Option<u64>,
    pub to: Option<u64>,
}

impl PageMeta {
    pub fn new(current_page: u64, per_page: u64, total: u64, items_on_page: u64) -> Self {
        let last_page = if total == 0 {
            1
        } else {
            total.div_ceil(per_page)
        };

        let (from, to) = if items_on_page == 0 {
            (None, None)
        } else {
            let from = (current_page - 1) * per_page + 1;
            (Some(from), Some(from + items_on_page - 1))
        };

        Self {
            current_page,
            last_page,
            per_page,
            total,
            from,
            to,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_page_defaults_and_clamps() {
        assert_eq!(clamp_per_page(None), 15);
        assert_eq!(clamp_per_page(Some(30)), 30);
        assert_eq!(clamp_per_page(Some(1000)), 50);
        assert_eq!(clamp_per_page(Some(0)), 1);
    }

    #[test]
    fn page_defaults_to_one() {
        assert_eq!(requested_page(None), 1);
        assert_eq!(requested_page(Some(0)), 1);
        assert_eq!(requested_page(Some(4)), 4);
    }

    #[test]
    fn meta_bookkeeping_matches_item_window() {
        let meta = PageMeta::new(2, 15, 31, 15);
        assert_eq!(meta.last_page, 3);
        assert_eq!(meta.from, Some(16));
        assert_eq!(meta.to, Some(30));

        let tail = PageMeta::new(3, 15, 31, 1);
        assert_eq!(tail.from, Some(31));
        assert_eq!(tail.to, Some(31));
    }

    #[test]
    fn empty_result_has_no_window() {
        let meta = PageMeta::new(1, 15, 0, 0);
        assert_eq!(meta.last_page, 1);
        assert_eq!(meta.from, None);
        assert_eq!(meta.to, None);
    }
}
