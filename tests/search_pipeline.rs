use scenetrace::{RankedMatches, SearchResponse, partition_by_confidence, resolve_body};

#[test]
fn fixture_parses_with_both_anilist_shapes() {
    let s = include_str!("data/search_response.json");
    let response: SearchResponse = serde_json::from_str(s).unwrap();

    assert_eq!(response.frame_count, 745506);
    assert_eq!(response.result.len(), 3);

    let structured = &response.result[0];
    let info = structured.anilist.info().unwrap();
    assert_eq!(info.id, 99939);
    assert_eq!(structured.display_title(), "Nekopara OVA");
    assert!(!structured.is_adult());

    let bare = &response.result[2];
    assert!(bare.anilist.info().is_none());
    assert_eq!(bare.anilist.id(), 20698);
    assert_eq!(bare.display_title(), "Anilist ID: 20698");
    assert_eq!(bare.anilist.url(), "https://anilist.co/anime/20698");
}

#[test]
fn fixture_resolves_sorted_and_partitioned() {
    let s = include_str!("data/search_response.json");
    let matches = resolve_body(reqwest::StatusCode::OK, s).unwrap();

    // Sorted descending by similarity.
    let sims: Vec<f64> = matches.iter().map(|m| m.similarity).collect();
    assert!(sims.windows(2).all(|w| w[0] >= w[1]));

    let RankedMatches::Grouped { high, low } = partition_by_confidence(matches) else {
        panic!("expected grouped matches");
    };
    assert_eq!(high.len(), 2);
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].display_title(), "Kimi no Na wa.");
}

#[test]
fn two_entry_response_splits_one_high_one_low() {
    let body = r#"{
        "error": "",
        "result": [
            {"anilist": 1, "filename": "high.mp4", "episode": 1, "from": 0.0, "to": 1.0, "similarity": 0.9, "video": "v", "image": "i"},
            {"anilist": 2, "filename": "low.mp4", "episode": 2, "from": 0.0, "to": 1.0, "similarity": 0.5, "video": "v", "image": "i"}
        ]
    }"#;
    let matches = resolve_body(reqwest::StatusCode::OK, body).unwrap();
    let RankedMatches::Grouped { high, low } = partition_by_confidence(matches) else {
        panic!("expected grouped matches");
    };
    assert_eq!(high.len(), 1);
    assert_eq!(high[0].filename, "high.mp4");
    assert_eq!(low.len(), 1);
    assert_eq!(low[0].filename, "low.mp4");
}

#[test]
fn empty_result_list_is_the_no_matches_signal() {
    let body = r#"{"error": "", "frameCount": 0, "result": []}"#;
    let matches = resolve_body(reqwest::StatusCode::OK, body).unwrap();
    assert!(matches!(
        partition_by_confidence(matches),
        RankedMatches::Empty
    ));
}
