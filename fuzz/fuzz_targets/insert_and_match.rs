#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (Vec<(String, i32)>, String)| {
    let mut router = waymark::Router::new();

    for (route, value) in data.0 {
        let inserted = router.insert(route.as_str(), value).is_ok();

        let _ = router.at(&data.1);
        router.check_priorities().unwrap();

        // a registered route can always be removed and re-registered
        if inserted {
            let removed = router.remove(route.as_str());
            assert!(removed.is_some());
            router.insert(route.as_str(), removed.unwrap()).unwrap();
        }
    }

    let _ = router.at(&data.1);
    router.check_priorities().unwrap();
});
