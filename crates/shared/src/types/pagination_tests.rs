use super::*;

#[test]
fn test_offset_first_page() {
    let req = PageRequest { page: 1, limit: 20 };
    assert_eq!(req.offset(), 0);
}

#[test]
fn test_offset_later_page() {
    let req = PageRequest { page: 3, limit: 25 };
    assert_eq!(req.offset(), 50);
}

#[test]
fn test_limit_clamped_to_max() {
    let req = PageRequest {
        page: 1,
        limit: 5000,
    };
    assert_eq!(req.limit_clamped(), u64::from(MAX_PAGE_LIMIT));
}

#[test]
fn test_zero_limit_clamped_to_one() {
    let req = PageRequest { page: 1, limit: 0 };
    assert_eq!(req.limit_clamped(), 1);
}

#[test]
fn test_page_response_total_pages() {
    let resp: PageResponse<u32> = PageResponse::new(vec![1, 2, 3], 1, 3, 10);
    assert_eq!(resp.meta.total_pages, 4);
    assert_eq!(resp.meta.total, 10);
}

#[test]
fn test_page_response_empty() {
    let resp: PageResponse<u32> = PageResponse::new(vec![], 1, 20, 0);
    assert_eq!(resp.meta.total_pages, 1);
}
