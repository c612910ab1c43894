//! # Transaction Integration Tests
//!
//! End-to-end coverage of the paging core through its public surface:
//!
//! - write/read round trips through commit and reopen
//! - rollback by dropping an uncommitted transaction
//! - copy-on-write isolation between concurrent transactions
//! - idempotent modify within a transaction
//! - overflow runs spanning several pages
//! - error classification for out-of-range pages, unknown flags, and
//!   corrupted metadata tags

use pagedb::{error_kind, Database, ErrorKind, PageType, PAGE_SIZE, TXN_NONE};
use tempfile::tempdir;

fn create_test_db(page_count: u64) -> (Database, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let db = Database::create(dir.path().join("pages.db"), page_count).unwrap();
    (db, dir)
}

const GREETING: &[u8] = b"hello page storage\0";

mod write_read {
    use super::*;

    #[test]
    fn committed_bytes_are_visible_to_later_transactions() {
        let (db, _dir) = create_test_db(16);

        {
            let mut tx = db.begin(TXN_NONE).unwrap();
            let mut page = tx.modify_page(3).unwrap();
            page[..GREETING.len()].copy_from_slice(GREETING);
            tx.commit().unwrap();
            tx.close();
        }

        let tx = db.begin(TXN_NONE).unwrap();
        let page = tx.get_page(3).unwrap();
        assert_eq!(&page[..GREETING.len()], GREETING);
        assert!(
            page[GREETING.len()..].iter().all(|&b| b == 0),
            "bytes past the greeting keep their original value"
        );
    }

    #[test]
    fn reads_inside_the_transaction_see_uncommitted_writes() {
        let (db, _dir) = create_test_db(16);
        let mut tx = db.begin(TXN_NONE).unwrap();

        tx.modify_page(7).unwrap()[..4].copy_from_slice(b"dirt");

        let page = tx.get_page(7).unwrap();
        assert_eq!(&page[..4], b"dirt");
    }

    #[test]
    fn round_trip_survives_reopening_the_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("pages.db");

        {
            let db = Database::create(&path, 16).unwrap();
            let mut tx = db.begin(TXN_NONE).unwrap();
            tx.modify_page(9).unwrap()[4000..4008].copy_from_slice(b"durable?");
            tx.commit().unwrap();
        }

        let db = Database::open(&path).unwrap();
        let tx = db.begin(TXN_NONE).unwrap();
        assert_eq!(&tx.get_page(9).unwrap()[4000..4008], b"durable?");
    }

    #[test]
    fn writing_page_zero_goes_through_the_metadata_guard() {
        let (db, _dir) = create_test_db(16);

        {
            let mut tx = db.begin(TXN_NONE).unwrap();
            let mut page = tx.modify_page(0).unwrap();
            assert_eq!(page.len(), PAGE_SIZE, "metadata pages are one page");
            // stay clear of entry 0, which carries the page's own tag
            page[256..256 + GREETING.len()].copy_from_slice(GREETING);
            tx.commit().unwrap();
        }

        let tx = db.begin(TXN_NONE).unwrap();
        let page = tx.get_page(0).unwrap();
        assert_eq!(&page[256..256 + GREETING.len()], GREETING);
        assert_eq!(page[0], PageType::Metadata as u8);
    }
}

mod rollback {
    use super::*;

    #[test]
    fn dropping_without_commit_discards_all_writes() {
        let (db, _dir) = create_test_db(16);

        {
            let mut tx = db.begin(TXN_NONE).unwrap();
            tx.modify_page(3).unwrap()[..GREETING.len()].copy_from_slice(GREETING);
            tx.close();
        }

        let tx = db.begin(TXN_NONE).unwrap();
        let page = tx.get_page(3).unwrap();
        assert!(page.iter().all(|&b| b == 0), "rollback leaves zeroes");
    }

    #[test]
    fn close_is_safe_straight_after_begin() {
        let (db, _dir) = create_test_db(16);

        let tx = db.begin(TXN_NONE).unwrap();
        tx.close();

        let tx = db.begin(TXN_NONE).unwrap();
        drop(tx);
    }

    #[test]
    fn commit_with_no_modifications_is_a_no_op() {
        let (db, _dir) = create_test_db(16);

        let mut tx = db.begin(TXN_NONE).unwrap();
        tx.commit().unwrap();
        tx.close();

        let tx = db.begin(TXN_NONE).unwrap();
        assert!(tx.get_page(1).unwrap().iter().all(|&b| b == 0));
    }
}

mod idempotent_modify {
    use super::*;

    #[test]
    fn repeated_modify_returns_the_same_buffer() {
        let (db, _dir) = create_test_db(16);
        let mut tx = db.begin(TXN_NONE).unwrap();

        let first_ptr = {
            let mut page = tx.modify_page(5).unwrap();
            page[..5].copy_from_slice(b"first");
            page.data().as_ptr()
        };

        let page = tx.modify_page(5).unwrap();
        assert_eq!(page.data().as_ptr(), first_ptr, "one buffer per page");
        assert_eq!(&page[..5], b"first", "the second call does not re-copy");
        assert_eq!(tx.modified_pages(), 1);
    }
}

mod isolation {
    use super::*;

    #[test]
    fn uncommitted_writes_are_invisible_to_other_transactions() {
        let (db, _dir) = create_test_db(16);

        let mut writer = db.begin(TXN_NONE).unwrap();
        writer.modify_page(2).unwrap()[..6].copy_from_slice(b"hidden");

        let reader = db.begin(TXN_NONE).unwrap();
        let page = reader.get_page(2).unwrap();
        assert!(
            page.iter().all(|&b| b == 0),
            "reader sees pre-modification bytes"
        );
    }

    #[test]
    fn commit_makes_writes_visible_to_transactions_begun_afterwards() {
        let (db, _dir) = create_test_db(16);

        let mut writer = db.begin(TXN_NONE).unwrap();
        writer.modify_page(2).unwrap()[..6].copy_from_slice(b"landed");
        writer.commit().unwrap();
        writer.close();

        let reader = db.begin(TXN_NONE).unwrap();
        assert_eq!(&reader.get_page(2).unwrap()[..6], b"landed");
    }
}

mod errors {
    use super::*;

    #[test]
    fn out_of_range_modify_is_invalid_argument_and_recoverable() {
        let (db, _dir) = create_test_db(16);
        let mut tx = db.begin(TXN_NONE).unwrap();

        let err = tx.modify_page(100).unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::InvalidArgument));
        assert_eq!(tx.modified_pages(), 0, "the failure left no partial state");

        // the transaction stays usable
        tx.modify_page(5).unwrap()[..2].copy_from_slice(b"ok");
        tx.commit().unwrap();
    }

    #[test]
    fn out_of_range_get_is_invalid_argument() {
        let (db, _dir) = create_test_db(16);
        let tx = db.begin(TXN_NONE).unwrap();

        let err = tx.get_page(16).unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::InvalidArgument));
    }

    #[test]
    fn unknown_flags_fail_before_any_state_exists() {
        let (db, _dir) = create_test_db(16);

        let err = db.begin(0x4000_0000).unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::InvalidArgument));
    }

    #[test]
    fn clobbered_metadata_tag_is_reported_as_corruption() {
        let (db, _dir) = create_test_db(16);

        {
            let mut tx = db.begin(TXN_NONE).unwrap();
            let mut page = tx.modify_page(0).unwrap();
            page[0] = 0x7F;
            tx.commit().unwrap();
        }

        let tx = db.begin(TXN_NONE).unwrap();
        let err = tx.get_page(5).unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::InvalidArgument));
        assert!(err.root_cause().to_string().contains("metadata"));
    }

    #[test]
    fn overflow_run_past_the_end_of_file_is_rejected() {
        let (db, _dir) = create_test_db(32);

        {
            let mut tx = db.begin(TXN_NONE).unwrap();
            tx.modify_metadata(30).unwrap().set_overflow_size(20000);
            tx.commit().unwrap();
        }

        // page 30's declared run is 3 pages but only 2 remain in the file
        let mut tx = db.begin(TXN_NONE).unwrap();
        let err = tx.modify_page(30).unwrap_err();
        assert_eq!(error_kind(&err), Some(ErrorKind::InvalidArgument));
    }
}

mod table_growth {
    use super::*;

    #[test]
    fn a_thousand_modified_pages_in_one_transaction() {
        let (db, _dir) = create_test_db(1024);
        let mut tx = db.begin(TXN_NONE).unwrap();

        let tail = PAGE_SIZE - 8;
        for page_num in 0..1024u64 {
            let mut page = tx.modify_page(page_num).unwrap();
            // the tail stays clear of metadata entry 0 on metadata pages
            page[tail..].copy_from_slice(&page_num.to_le_bytes());
        }
        assert_eq!(tx.modified_pages(), 1024);

        tx.commit().unwrap();
        tx.close();

        let tx = db.begin(TXN_NONE).unwrap();
        for page_num in [0u64, 1, 127, 128, 511, 1023] {
            let page = tx.get_page(page_num).unwrap();
            assert_eq!(
                &page[tail..],
                &page_num.to_le_bytes(),
                "page {}",
                page_num
            );
        }
    }
}

mod overflow {
    use super::*;

    fn pattern(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    #[test]
    fn declared_overflow_run_is_cloned_and_committed_whole() {
        let (db, _dir) = create_test_db(32);

        {
            let mut tx = db.begin(TXN_NONE).unwrap();
            tx.modify_metadata(10).unwrap().set_overflow_size(20000);
            tx.commit().unwrap();
        }

        let run = pattern(3 * PAGE_SIZE);
        {
            let mut tx = db.begin(TXN_NONE).unwrap();
            let mut page = tx.modify_page(10).unwrap();
            assert_eq!(page.len(), 3 * PAGE_SIZE);
            assert_eq!(page.overflow_size(), 20000);
            page.data_mut().copy_from_slice(&run);
            tx.commit().unwrap();
        }

        let tx = db.begin(TXN_NONE).unwrap();
        let page = tx.get_page(10).unwrap();
        assert_eq!(page.overflow_size(), 20000);
        assert_eq!(page.len(), 3 * PAGE_SIZE);
        assert_eq!(page.data(), &run[..], "the whole run survives bit-exactly");
    }

    #[test]
    fn requested_size_larger_than_metadata_wins() {
        let (db, _dir) = create_test_db(32);
        let mut tx = db.begin(TXN_NONE).unwrap();

        let page = tx.modify_page_with(4, 10000).unwrap();
        assert_eq!(page.len(), 2 * PAGE_SIZE);
        assert_eq!(page.overflow_size(), 10000);
    }

    #[test]
    fn metadata_size_larger_than_request_wins() {
        let (db, _dir) = create_test_db(32);

        {
            let mut tx = db.begin(TXN_NONE).unwrap();
            tx.modify_metadata(4).unwrap().set_overflow_size(20000);
            tx.commit().unwrap();
        }

        let mut tx = db.begin(TXN_NONE).unwrap();
        // a plain modify still clones the whole declared run
        let page = tx.modify_page(4).unwrap();
        assert_eq!(page.len(), 3 * PAGE_SIZE);
    }
}
