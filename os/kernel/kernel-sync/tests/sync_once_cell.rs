use kernel_sync::SyncOnceCell;
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn empty_until_set() {
    let c = SyncOnceCell::<u32>::new();
    assert!(!c.is_ready());
    assert!(c.get().is_none());
    assert_eq!(c.set(5), Ok(&5));
    assert!(c.is_ready());
    assert_eq!(c.get(), Some(&5));
}

#[test]
fn second_set_is_rejected_and_returns_value() {
    let c = SyncOnceCell::new();
    c.set(String::from("first")).unwrap();
    let err = c.set(String::from("second")).unwrap_err();
    assert_eq!(err, "second");
    assert_eq!(c.get().map(String::as_str), Some("first"));
}

#[test]
fn readers_see_the_published_value() {
    let cell = SyncOnceCell::new();
    let published = Barrier::new(3);

    thread::scope(|s| {
        for _ in 0..2 {
            s.spawn(|| {
                published.wait();
                assert_eq!(cell.get().map(Vec::len), Some(16));
            });
        }
        cell.set(vec![0_u8; 16]).unwrap();
        published.wait();
    });
}

#[test]
fn exactly_one_concurrent_setter_wins() {
    let threads = 8;
    let cell = Arc::new(SyncOnceCell::new());
    let start = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let cell = Arc::clone(&cell);
            let start = Arc::clone(&start);
            thread::spawn(move || {
                start.wait();
                cell.set(i).is_ok()
            })
        })
        .collect();

    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|won| *won)
        .count();
    assert_eq!(winners, 1);
    assert!(cell.is_ready());
}

#[test]
fn stored_value_is_dropped_with_cell() {
    let payload = Arc::new(());
    {
        let c = SyncOnceCell::new();
        c.set(Arc::clone(&payload)).unwrap();
        assert_eq!(Arc::strong_count(&payload), 2);
    }
    assert_eq!(Arc::strong_count(&payload), 1);
}
