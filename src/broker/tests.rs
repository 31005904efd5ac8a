use std::sync::Arc;
use std::thread;

use super::pid_set::{PidSet, parse_subscriber_id};
use super::surface::{AccessMode, SurfaceAllocator};
use super::{ControlSurfaceRouter, ListingLock, SurfaceKind, TopicRegistry};
use crate::config::RegistrySettings;
use crate::utils::error::RegistryError;

fn router_with(settings: RegistrySettings) -> ControlSurfaceRouter {
    let registry = Arc::new(TopicRegistry::new(&settings));
    ControlSurfaceRouter::new(registry, &settings)
}

fn router() -> ControlSurfaceRouter {
    router_with(RegistrySettings::default())
}

#[test]
fn test_pid_set_keeps_order_and_duplicates() {
    let mut set = PidSet::new();
    assert_eq!(set.format_listing(), "\n");

    set.insert(5);
    set.insert(5);
    set.insert(42);
    assert_eq!(set.len(), 3);
    assert_eq!(set.iter().collect::<Vec<_>>(), vec![5, 5, 42]);
    assert_eq!(set.format_listing(), "5 5 42 \n");

    set.clear();
    assert!(set.is_empty());
}

#[test]
fn test_parse_subscriber_id() {
    assert_eq!(parse_subscriber_id(b"0"), Ok(0));
    assert_eq!(parse_subscriber_id(b"4194304"), Ok(4_194_304));
    assert_eq!(parse_subscriber_id(b"007"), Ok(7));

    let bad_inputs: [&[u8]; 7] = [b"12a", b"a12", b"-1", b"1 2", b"", b"+3", b"99999999999"];
    for bad in bad_inputs {
        assert!(
            matches!(parse_subscriber_id(bad), Err(RegistryError::InvalidSubscriberId(_))),
            "{:?} should be rejected",
            String::from_utf8_lossy(bad)
        );
    }
}

#[test]
fn test_surface_kinds() {
    assert_eq!(SurfaceKind::Subscribe.access(), AccessMode::WriteOnly);
    assert_eq!(SurfaceKind::SubscribersList.access(), AccessMode::ReadOnly);
    assert_eq!(SurfaceKind::SignalNr.access(), AccessMode::WriteOnly);
    assert_eq!(SurfaceKind::Endpoint.access(), AccessMode::ReadWrite);

    for kind in SurfaceKind::ALL {
        assert_eq!(SurfaceKind::from_file_name(kind.file_name()), Some(kind));
    }
    assert_eq!(SurfaceKind::from_file_name("new_topic"), None);
}

#[test]
fn test_allocator_capacity_and_release() {
    let allocator = SurfaceAllocator::new(2);
    let a = allocator.allocate("t", SurfaceKind::Subscribe).unwrap();
    let b = allocator.allocate("t", SurfaceKind::SubscribersList).unwrap();
    assert_ne!(a, b);

    let err = allocator.allocate("t", SurfaceKind::SignalNr).unwrap_err();
    assert_eq!(err.code(), "allocation_error");

    assert!(allocator.release(a));
    assert!(!allocator.release(a));
    let c = allocator.allocate("t", SurfaceKind::SignalNr).unwrap();
    // ids are never reused
    assert!(c > b);
    assert_eq!(allocator.live(), 2);
}

#[test]
fn test_create_then_find_has_empty_subscribers() {
    let registry = TopicRegistry::default();
    for name in ["news", "a", "topic with spaces", "ünïcode"] {
        let handles = registry.create_topic(name).unwrap();
        assert_eq!(handles.topic(), name);

        let entry = registry.find_topic(name).unwrap();
        assert_eq!(entry.name(), name);
        assert_eq!(entry.path(), format!("psipc/topics/{name}"));
        assert!(entry.subscribers().is_empty());
        assert_eq!(entry.signal().nr_signal, None);
    }
    assert_eq!(registry.len(), 4);
    assert_eq!(registry.live_surfaces(), 16);
}

#[test]
fn test_topic_surfaces_are_unique_and_bound() {
    let registry = TopicRegistry::default();
    let news = registry.create_topic("news").unwrap();
    let sport = registry.create_topic("sport").unwrap();

    let mut ids: Vec<_> = news.iter().chain(sport.iter()).map(|h| h.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);

    for handle in news.iter() {
        assert_eq!(handle.topic, "news");
        assert_eq!(registry.resolve_surface(handle.id).as_ref(), Some(handle));
    }
    assert_eq!(news.subscribe.path(), "psipc/topics/news/subscribe");
    assert_eq!(news.endpoint.path(), "psipc/topics/news/endpoint");
}

#[test]
fn test_resolve_by_path() {
    let registry = TopicRegistry::default();
    let handles = registry.create_topic("news").unwrap();

    assert_eq!(
        registry.resolve_path("psipc/topics/news/subscribers_list"),
        Some(handles.subscribers_list.clone())
    );
    assert!(registry.find_by_path("psipc/topics/news").is_some());
    assert!(registry.find_by_path("other/news").is_none());
    assert!(registry.resolve_path("psipc/topics/news/bogus").is_none());
    assert!(registry.resolve_path("psipc/topics/missing/subscribe").is_none());
}

#[test]
fn test_duplicate_and_invalid_names_rejected() {
    let registry = TopicRegistry::default();
    registry.create_topic("news").unwrap();

    assert_eq!(
        registry.create_topic("news"),
        Err(RegistryError::TopicExists("news".to_string()))
    );
    assert!(matches!(
        registry.create_topic(""),
        Err(RegistryError::InvalidTopicName(_))
    ));
    assert!(matches!(
        registry.create_topic("a/b"),
        Err(RegistryError::InvalidTopicName(_))
    ));
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.live_surfaces(), 4);
}

#[test]
fn test_failed_allocation_rolls_back() {
    let settings = RegistrySettings {
        max_surfaces: 6,
        ..RegistrySettings::default()
    };
    let registry = TopicRegistry::new(&settings);
    registry.create_topic("first").unwrap();

    let err = registry.create_topic("second").unwrap_err();
    assert!(matches!(
        err,
        RegistryError::Allocation {
            kind: SurfaceKind::SignalNr,
            ..
        }
    ));
    assert!(registry.find_topic("second").is_none());
    assert_eq!(registry.len(), 1);
    assert_eq!(registry.live_surfaces(), 4);

    // the registry keeps working after the failure
    registry.destroy_all();
    registry.create_topic("second").unwrap();
}

#[test]
fn test_subscribe_order_and_duplicates() {
    let router = router();
    let handles = router.create_topic(b"news\n").unwrap();

    for pid in ["5\n", "5\n", "42\n"] {
        let receipt = router.subscribe(&handles.subscribe, pid.as_bytes());
        assert!(receipt.is_ok());
        assert_eq!(receipt.received, pid.len());
    }

    let listing = router.list_subscribers(&handles.subscribers_list).unwrap();
    assert_eq!(listing, "5 5 42 \n");
}

#[test]
fn test_topics_are_isolated() {
    let router = router();
    let n1 = router.create_topic(b"n1\n").unwrap();
    let n2 = router.create_topic(b"n2\n").unwrap();

    assert!(router.subscribe(&n1.subscribe, b"1234\n").is_ok());

    assert_eq!(router.list_subscribers(&n1.subscribers_list).unwrap(), "1234 \n");
    assert_eq!(router.list_subscribers(&n2.subscribers_list).unwrap(), "\n");
}

#[test]
fn test_malformed_pid_rejected_but_acknowledged() {
    let router = router();
    let handles = router.create_topic(b"news\n").unwrap();
    router.subscribe(&handles.subscribe, b"7\n");

    let receipt = router.subscribe(&handles.subscribe, b"12a\n");
    assert_eq!(receipt.received, 4);
    assert_eq!(
        receipt.outcome,
        Err(RegistryError::InvalidSubscriberId("12a".to_string()))
    );

    assert_eq!(router.list_subscribers(&handles.subscribers_list).unwrap(), "7 \n");
}

#[test]
fn test_subscribe_input_is_bounded() {
    let settings = RegistrySettings {
        max_message_len: 4,
        ..RegistrySettings::default()
    };
    let router = router_with(settings);
    let handles = router.create_topic(b"t\n").unwrap();

    let receipt = router.subscribe(&handles.subscribe, b"123456\n");
    assert_eq!(receipt.received, 4);
    assert!(receipt.is_ok());
    assert_eq!(router.list_subscribers(&handles.subscribers_list).unwrap(), "1234 \n");
}

#[test]
fn test_second_listing_is_busy_until_first_closes() {
    let router = router();
    let handles = router.create_topic(b"news\n").unwrap();
    router.subscribe(&handles.subscribe, b"1\n");
    router.subscribe(&handles.subscribe, b"2\n");

    let mut first = router.open_listing(&handles.subscribers_list).unwrap();
    assert_eq!(first.read(2).unwrap(), b"1 ");

    let busy = router.open_listing(&handles.subscribers_list).unwrap_err();
    assert_eq!(busy, RegistryError::Busy("subscribers_list"));
    assert!(busy.is_retryable());

    drop(first);

    let mut second = router.open_listing(&handles.subscribers_list).unwrap();
    assert_eq!(second.read(2).unwrap(), b"1 ");
    assert_eq!(second.read_to_string().unwrap(), "2 \n");
}

#[test]
fn test_listing_reads_in_chunks_until_empty() {
    let router = router();
    let handles = router.create_topic(b"news\n").unwrap();
    for pid in ["100", "200", "300"] {
        router.subscribe(&handles.subscribe, pid.as_bytes());
    }

    let mut reader = router.open_listing(&handles.subscribers_list).unwrap();
    let mut collected = Vec::new();
    loop {
        let chunk = reader.read(5).unwrap();
        assert!(chunk.len() <= 5);
        if chunk.is_empty() {
            break;
        }
        collected.extend(chunk);
    }
    assert_eq!(collected, b"100 200 300 \n");
    assert!(reader.is_exhausted());

    // no restart without a reopen
    router.subscribe(&handles.subscribe, b"400");
    assert!(reader.read(64).unwrap().is_empty());
}

#[test]
fn test_listing_lock_scope() {
    let per_topic = router();
    let a = per_topic.create_topic(b"a").unwrap();
    let b = per_topic.create_topic(b"b").unwrap();
    let _held = per_topic.open_listing(&a.subscribers_list).unwrap();
    assert!(per_topic.open_listing(&b.subscribers_list).is_ok());

    let global = router_with(RegistrySettings {
        listing_lock: ListingLock::Global,
        ..RegistrySettings::default()
    });
    let a = global.create_topic(b"a").unwrap();
    let b = global.create_topic(b"b").unwrap();
    let held = global.open_listing(&a.subscribers_list).unwrap();
    assert_eq!(
        global.open_listing(&b.subscribers_list).unwrap_err(),
        RegistryError::Busy("subscribers_list")
    );
    drop(held);
    assert!(global.open_listing(&b.subscribers_list).is_ok());
}

#[test]
fn test_creation_gate_is_exclusive() {
    let router = router();
    let mut creator = router.open_creator().unwrap();
    assert!(router.gate().creation_open());

    assert_eq!(
        router.create_topic(b"other\n").unwrap_err(),
        RegistryError::Busy("new_topic")
    );
    assert!(router.open_creator().is_err());

    creator.write(b"news\n").unwrap();
    assert!(creator.read().is_empty());
    // a failed write leaves the request staged
    assert!(creator.write(b"news\n").is_err());
    assert_eq!(creator.read(), b"news");

    drop(creator);
    assert!(!router.gate().creation_open());
    assert!(router.create_topic(b"other\n").is_ok());
}

#[test]
fn test_destroy_all_releases_everything() {
    let router = router();
    let names = ["a", "b", "c"];
    let mut handles = Vec::new();
    for name in names {
        let h = router.create_topic(name.as_bytes()).unwrap();
        router.subscribe(&h.subscribe, b"9");
        handles.push(h);
    }

    let registry = router.registry();
    assert_eq!(registry.destroy_all(), 3);
    assert!(registry.is_empty());
    assert_eq!(registry.live_surfaces(), 0);
    for name in names {
        assert!(registry.find_topic(name).is_none());
    }

    // stale handles fail instead of reaching a new topic of the same name
    router.create_topic(b"a").unwrap();
    let receipt = router.subscribe(&handles[0].subscribe, b"1");
    assert_eq!(receipt.outcome, Err(RegistryError::TopicNotFound("a".to_string())));
    assert!(router.resolve(handles[0].subscribe.id).is_err());

    // empty registry: no-op
    registry.destroy_all();
    assert_eq!(registry.destroy_all(), 0);
}

#[test]
fn test_publish_and_configure_signal_are_stubs() {
    let router = router();
    let handles = router.create_topic(b"news\n").unwrap();
    router.subscribe(&handles.subscribe, b"3");

    let receipt = router.configure_signal(&handles.signal_nr, b"10\n");
    assert!(receipt.is_ok());
    assert_eq!(receipt.received, 3);

    let receipt = router.publish(&handles.endpoint, b"hello");
    assert_eq!(
        receipt.outcome,
        Err(RegistryError::NotImplemented(SurfaceKind::Endpoint))
    );
    assert_eq!(receipt.received, 0);

    let entry = router.registry().find_topic("news").unwrap();
    assert_eq!(entry.subscribers().iter().collect::<Vec<_>>(), vec![3]);
    assert_eq!(entry.signal().nr_signal, None);
}

#[test]
fn test_write_dispatches_on_surface_kind() {
    let router = router();
    let handles = router.create_topic(b"news\n").unwrap();

    assert!(router.write(&handles.subscribe, b"11\n").is_ok());
    assert!(router.write(&handles.signal_nr, b"10\n").is_ok());
    assert_eq!(
        router.write(&handles.endpoint, b"x").outcome,
        Err(RegistryError::NotImplemented(SurfaceKind::Endpoint))
    );
    assert_eq!(
        router.write(&handles.subscribers_list, b"x").outcome,
        Err(RegistryError::NotWritable(SurfaceKind::SubscribersList))
    );

    assert_eq!(router.list_subscribers(&handles.subscribers_list).unwrap(), "11 \n");
}

#[test]
fn test_operations_check_surface_kind() {
    let router = router();
    let handles = router.create_topic(b"news\n").unwrap();

    let receipt = router.subscribe(&handles.signal_nr, b"1");
    assert_eq!(
        receipt.outcome,
        Err(RegistryError::WrongSurface {
            expected: SurfaceKind::Subscribe,
            actual: SurfaceKind::SignalNr,
        })
    );
    assert!(router.open_listing(&handles.subscribe).is_err());
    assert!(
        router
            .registry()
            .find_topic("news")
            .unwrap()
            .subscribers()
            .is_empty()
    );
}

#[test]
fn test_topics_listed_in_creation_order() {
    let router = router();
    for name in ["zeta", "alpha", "mid"] {
        router.create_topic(name.as_bytes()).unwrap();
    }
    let handles = router.surface("alpha", SurfaceKind::Subscribe).unwrap();
    router.subscribe(&handles, b"1");

    let topics = router.registry().topics();
    let names: Vec<_> = topics.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"]);
    assert_eq!(topics[1].subscribers, 1);
    assert_eq!(topics[1].path, "psipc/topics/alpha");
}

#[test]
fn test_concurrent_subscribers_and_creators() {
    let router = Arc::new(router());
    let handles = router.create_topic(b"shared\n").unwrap();

    let workers: Vec<_> = (0..8)
        .map(|i| {
            let router = router.clone();
            let surface = handles.subscribe.clone();
            thread::spawn(move || {
                for pid in 0..100u32 {
                    let pid = (i * 1000 + pid).to_string();
                    assert!(router.subscribe(&surface, pid.as_bytes()).is_ok());
                }
                let _ = router.registry().create_topic(&format!("t{i}"));
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    let entry = router.registry().find_topic("shared").unwrap();
    let pids: Vec<_> = entry.subscribers().iter().collect();
    assert_eq!(pids.len(), 800);
    // each worker's pids keep their own order
    for i in 0..8u32 {
        let mine: Vec<_> = pids.iter().filter(|p| **p / 1000 == i).copied().collect();
        let expected: Vec<_> = (0..100).map(|p| i * 1000 + p).collect();
        assert_eq!(mine, expected);
    }
    assert_eq!(router.registry().len(), 9);
    assert_eq!(router.registry().live_surfaces(), 36);
}
