use genre_classifier_core::{Genre, GenreError, LabelTable};

#[test]
fn every_trained_index_decodes() {
    let table = LabelTable::default();
    assert_eq!(table.len(), 10);
    for (i, expected) in Genre::ALL.iter().enumerate() {
        let g = table.decode(i).unwrap();
        assert_eq!(g, *expected);
        assert_eq!(table.index_of(g), Some(i));
    }
    assert_eq!(table.decode(0).unwrap().as_str(), "blues");
    assert_eq!(table.decode(9).unwrap().as_str(), "rock");
}

#[test]
fn out_of_range_index_is_unknown_class() {
    let table = LabelTable::default();
    let err = table.decode(10).unwrap_err();
    assert!(matches!(
        err,
        GenreError::UnknownClass {
            index: 10,
            classes: 10
        }
    ));
    assert!(err.is_per_request());
}

#[test]
fn table_must_hold_each_genre_once() {
    let mut labels = Genre::ALL.to_vec();
    labels[9] = Genre::Blues;
    assert!(LabelTable::new(labels).is_err());
    assert!(LabelTable::new(Genre::ALL[..9].to_vec()).is_err());

    let mut shuffled = Genre::ALL.to_vec();
    shuffled.reverse();
    let table = LabelTable::new(shuffled).unwrap();
    assert_eq!(table.decode(0).unwrap(), Genre::Rock);
}

#[test]
fn genre_names_parse_and_serialize() {
    assert_eq!("hiphop".parse::<Genre>().unwrap(), Genre::Hiphop);
    assert_eq!(" Jazz ".parse::<Genre>().unwrap(), Genre::Jazz);
    assert!("polka".parse::<Genre>().is_err());

    let json = serde_json::to_string(&LabelTable::default()).unwrap();
    assert!(json.starts_with(r#"["blues","classical","country""#));
    let back: LabelTable = serde_json::from_str(&json).unwrap();
    assert_eq!(back, LabelTable::default());
}
