use super::*;
use crate::data::Column;
use crate::preprocessing::CULTURAL_FEATURES;

fn records() -> Vec<RawRecord> {
    vec![
        RawRecord::rated("u1", "i1", 55.75, 37.61, 4.0),
        RawRecord::rated("u2", "i2", 55.76, 37.62, 3.0),
        RawRecord::rated("u3", "i1", 40.71, -74.00, 2.0),
    ]
}

fn frame(records: &[RawRecord]) -> DataFrame {
    ColumnSchema::default()
        .frame_from_records(records)
        .expect("valid records")
}

fn config() -> GeoRecommenderConfig {
    GeoRecommenderConfig::default()
        .with_n_clusters(2)
        .with_n_epochs(5)
        .with_learning_rate(0.05)
}

fn fitted(config: GeoRecommenderConfig) -> GeoRecommender {
    fitted_on(config, &records())
}

fn fitted_on(config: GeoRecommenderConfig, records: &[RawRecord]) -> GeoRecommender {
    let mut rec = GeoRecommender::new(config);
    rec.fit(&frame(records)).expect("fit succeeds");
    rec
}

#[test]
fn test_small_scenario() {
    let rec = fitted(config());

    let history = rec.train_history();
    assert_eq!(history.len(), 5);
    for (i, record) in history.iter().enumerate() {
        assert_eq!(record.epoch, i);
    }
    assert!(history[1].rmse <= history[0].rmse);

    let clusters = rec.cluster_centers().expect("fitted");
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters.values().map(|c| c.size).sum::<usize>(), 3);
    assert!(clusters.values().all(|c| c.size >= 1));
    assert_eq!(rec.n_clusters(), 2);
}

#[test]
fn test_df_processed_has_ratings() {
    let rec = fitted(config());
    let processed = rec.df_processed().expect("fitted");
    assert_eq!(processed.len(), 3);
    let ratings = processed.ratings().expect("rated");
    assert_eq!(ratings.as_slice(), &[4.0, 3.0, 2.0]);
    let frame = processed.to_frame().expect("non-empty");
    assert!(frame.has_column("rating"));
    assert!(frame.has_column("user_id"));
}

#[test]
fn test_codecs_round_trip() {
    let rec = fitted(config());
    let users = rec.user_codec().expect("fitted");
    for raw in ["u1", "u2", "u3"] {
        assert_eq!(users.decode(users.lookup(raw)), Some(raw));
    }
    assert_eq!(rec.item_codec().map(IdCodec::len), Some(2));
}

#[test]
fn test_preprocess_data_is_pure() {
    let rec = fitted(config());
    let query = frame(&[RawRecord::query("u9", "i1", 55.75, 37.61)]);

    let first = rec.preprocess_data(&query).expect("fitted");
    let second = rec.preprocess_data(&query).expect("fitted");
    assert_eq!(first, second);
    assert_eq!(first.rows()[0].user_id, IdCodec::UNKNOWN);
    assert_eq!(rec.user_codec().map(IdCodec::len), Some(3));
}

#[test]
fn test_cold_start_matches_fallback_formula() {
    let rec = fitted(config());
    let model = rec.model().expect("fitted");
    let item = rec.item_codec().expect("fitted").lookup("i1");

    for cluster in 0..rec.n_clusters() {
        let score = rec
            .predict_one(IdCodec::UNKNOWN, item, cluster)
            .expect("fitted");
        let expected = model.global_bias()
            + model.geo_weight() * model.geo_bias()[cluster]
            + model.cultural_weight() * model.cluster_cultural()[cluster];
        assert!(score.is_finite());
        assert_eq!(score, expected);
    }
}

#[test]
fn test_predict_raw_ids() {
    let rec = fitted(config());
    let known = rec.predict("u1", "i1", 55.75, 37.61).expect("fitted");
    assert!(known.is_finite());

    let cold = rec.predict("stranger", "i1", 55.75, 37.61).expect("fitted");
    let cluster = rec
        .preprocess_data(&frame(&[RawRecord::query("stranger", "i1", 55.75, 37.61)]))
        .expect("fitted")
        .rows()[0]
        .geo_cluster;
    let model = rec.model().expect("fitted");
    assert!((cold - model.cold_start_score(cluster)).abs() < 1e-6);
}

#[test]
fn test_cultural_disabled_equals_zero_weight() {
    let off = fitted(config().with_cultural_features(false));
    let zero = fitted(config().with_cultural_features(false).with_cultural_weight(0.0));
    let on_zero = fitted(config().with_cultural_weight(0.0));

    let processed = off.df_processed().expect("fitted");
    assert!(processed.cultural_keys().is_empty());
    let names = processed.to_frame().expect("non-empty").column_names().join(",");
    assert!(CULTURAL_FEATURES.iter().all(|c| !names.contains(c)));

    for user in [0, 1, 2, IdCodec::UNKNOWN] {
        for item in [0, 1] {
            for cluster in [0, 1] {
                let a = off.predict_one(user, item, cluster).expect("fitted");
                let b = zero.predict_one(user, item, cluster).expect("fitted");
                let c = on_zero.predict_one(user, item, cluster).expect("fitted");
                assert_eq!(a, b);
                assert!((a - c).abs() < 1e-5);
            }
        }
    }
}

#[test]
fn test_refit_is_deterministic() {
    let a = fitted(config());
    let b = fitted(config());
    assert_eq!(a.train_history(), b.train_history());
    assert_eq!(a.cluster_centers(), b.cluster_centers());
    assert_eq!(a.model(), b.model());
}

#[test]
fn test_failed_fit_keeps_previous_state() {
    let mut rec = fitted(config());
    let before = rec.train_history().to_vec();

    let mut empty = frame(&[]);
    empty
        .add_column("[Rating]".to_string(), Column::Numeric(Vector::zeros(0)))
        .expect("zero-length column");
    let err = rec.fit(&empty).unwrap_err();
    assert!(matches!(err, GeoRecError::EmptyDataset { .. }));
    assert_eq!(rec.train_history(), before.as_slice());

    let unrated = frame(&[RawRecord::query("u1", "i1", 0.0, 0.0)]);
    let err = rec.fit(&unrated).unwrap_err();
    assert!(matches!(err, GeoRecError::Schema { .. }));
    assert!(rec.is_fitted());
}

#[test]
fn test_invalid_config_rejected_before_fit() {
    let mut rec = GeoRecommender::new(config().with_n_factors(0));
    let err = rec.fit(&frame(&records())).unwrap_err();
    assert!(matches!(err, GeoRecError::InvalidHyperparameter { .. }));
    assert!(!rec.is_fitted());
}

#[test]
fn test_unfitted_accessors() {
    let rec = GeoRecommender::default();
    assert!(!rec.is_fitted());
    assert!(rec.train_history().is_empty());
    assert!(rec.df_processed().is_none());
    assert!(rec.cluster_centers().is_none());
    assert!(matches!(rec.predict_one(0, 0, 0), Err(GeoRecError::NotFitted)));
    assert!(matches!(
        rec.preprocess_data(&frame(&records())),
        Err(GeoRecError::NotFitted)
    ));
    assert_eq!(rec.n_clusters(), 10);
}

#[test]
fn test_hyperparameter_accessors() {
    let rec = GeoRecommender::new(
        GeoRecommenderConfig::default()
            .with_geo_weight(0.5)
            .with_cultural_weight(0.1)
            .with_n_factors(8)
            .with_n_epochs(3)
            .with_cultural_features(false),
    );
    assert_eq!(rec.geo_weight(), 0.5);
    assert_eq!(rec.cultural_weight(), 0.1);
    assert_eq!(rec.n_factors(), 8);
    assert_eq!(rec.n_epochs(), 3);
    assert!(!rec.cultural_features());
}

#[test]
fn test_degenerate_clusters_are_clamped() {
    let same_place = vec![
        RawRecord::rated("u1", "i1", 10.0, 10.0, 4.0),
        RawRecord::rated("u2", "i1", 10.0, 10.0, 2.0),
    ];
    let mut rec = GeoRecommender::new(config().with_n_clusters(5));
    rec.fit(&frame(&same_place)).expect("fit succeeds");
    assert_eq!(rec.requested_clusters(), 5);
    assert_eq!(rec.n_clusters(), 1);
    assert_eq!(rec.cluster_centers().map(BTreeMap::len), Some(1));
}

#[test]
fn test_fit_with_stop() {
    let mut rec = GeoRecommender::new(config().with_n_epochs(10));
    rec.fit_with(&frame(&records()), |record| {
        if record.epoch == 1 {
            TrainingControl::Stop
        } else {
            TrainingControl::Continue
        }
    })
    .expect("fit succeeds");
    assert_eq!(rec.train_history().len(), 2);
}

#[test]
fn test_train_then_replace_state() {
    let mut rec = GeoRecommender::new(config());
    let state = rec.train(&frame(&records())).expect("train succeeds");
    assert!(!rec.is_fitted());
    assert_eq!(state.history().len(), 5);

    assert!(rec.replace_state(state).is_none());
    assert!(rec.is_fitted());
    assert_eq!(rec.state().map(|s| s.history().len()), Some(5));
}

#[test]
fn test_replace_state_adopts_config() {
    let trained_with = config()
        .with_geo_weight(0.7)
        .with_n_factors(3)
        .with_n_epochs(2);
    let state = GeoRecommender::new(trained_with.clone())
        .train(&frame(&records()))
        .expect("train succeeds");
    assert_eq!(state.config(), &trained_with);

    let mut rec = GeoRecommender::default();
    rec.replace_state(state);

    assert_eq!(rec.config(), &trained_with);
    assert_eq!(rec.geo_weight(), 0.7);
    assert_eq!(rec.n_factors(), 3);
    assert_eq!(rec.n_epochs(), 2);
    assert_eq!(rec.requested_clusters(), 2);
    let model = rec.model().expect("fitted");
    assert_eq!(rec.geo_weight(), model.geo_weight());
    assert_eq!(rec.n_factors(), model.n_factors());
    assert_eq!(rec.train_history().len(), rec.n_epochs());
}

fn country_records() -> Vec<RawRecord> {
    vec![
        RawRecord::rated("u1", "i1", 55.75, 37.61, 5.0).with_attribute("RU"),
        RawRecord::rated("u2", "i2", 55.76, 37.62, 5.0).with_attribute("RU"),
        RawRecord::rated("u3", "i1", 55.74, 37.60, 1.0).with_attribute("FI"),
        RawRecord::rated("u4", "i2", 40.71, -74.00, 2.0).with_attribute("US"),
    ]
}

#[test]
fn test_predict_one_uses_cluster_cultural_signal() {
    let rec = fitted_on(config().with_cultural_weight(0.5), &country_records());
    let model = rec.model().expect("fitted");
    let table = rec.state().expect("fitted").preprocessor().cultural_table();

    let row = &rec.df_processed().expect("fitted").rows()[0];
    let cluster_vector = table.lookup(&CulturalKey::Cluster(row.geo_cluster));
    let row_signal = row.cultural.as_ref().map(CulturalTable::signal).expect("cultural");
    assert!((row_signal - CulturalTable::signal(&cluster_vector)).abs() > 1e-3);

    let by_record = rec.predict_record(row).expect("fitted");
    assert_eq!(
        by_record,
        model.predict_with_cultural(row.user_id, row.item_id, row.geo_cluster, row.cultural.as_ref())
    );

    let by_ids = rec
        .predict_one(row.user_id, row.item_id, row.geo_cluster)
        .expect("fitted");
    assert_eq!(
        by_ids,
        model.predict_with_cultural(row.user_id, row.item_id, row.geo_cluster, Some(&cluster_vector))
    );
    assert!((by_ids - by_record).abs() > 1e-4);
}

#[test]
fn test_predict_one_matches_record_without_attribute() {
    let rec = fitted(config().with_cultural_weight(0.5));
    let processed = rec.df_processed().expect("fitted");
    for row in processed.rows() {
        let by_ids = rec
            .predict_one(row.user_id, row.item_id, row.geo_cluster)
            .expect("fitted");
        assert_eq!(by_ids, rec.predict_record(row).expect("fitted"));
    }
}

#[test]
fn test_preprocess_data_schema_error_keeps_state() {
    let rec = fitted(config());
    let before = rec.train_history().to_vec();
    let no_coordinates = DataFrame::new(vec![
        ("[User ID]".to_string(), Column::Text(vec!["u1".into()])),
        ("[IP No.]".to_string(), Column::Text(vec!["i1".into()])),
    ])
    .expect("valid frame");

    let err = rec.preprocess_data(&no_coordinates).unwrap_err();
    assert!(matches!(err, GeoRecError::Schema { .. }));
    assert_eq!(rec.train_history(), before.as_slice());
    assert_eq!(rec.user_codec().map(IdCodec::len), Some(3));
}

#[test]
fn test_rating_bounds_clamp_predictions() {
    let rec = fitted(config().with_rating_bounds(2.5, 3.5));
    for user in [0, 1, 2, IdCodec::UNKNOWN] {
        let score = rec.predict_one(user, 0, 0).expect("fitted");
        assert!((2.5..=3.5).contains(&score));
    }
}

#[test]
fn test_evaluate() {
    let rec = fitted(config().with_n_epochs(50));
    let (rmse, mae) = rec.evaluate(&frame(&records())).expect("rated");
    let last = rec.train_history().last().expect("history");
    assert!((rmse - last.rmse).abs() < 1e-5);
    assert!((mae - last.mae).abs() < 1e-5);

    let unrated = frame(&[RawRecord::query("u1", "i1", 55.75, 37.61)]);
    assert!(matches!(rec.evaluate(&unrated), Err(GeoRecError::Schema { .. })));
}

#[test]
fn test_config_serde_defaults() {
    let config: GeoRecommenderConfig =
        serde_json::from_str(r#"{"n_factors": 4, "geo_weight": 0.0}"#).expect("valid json");
    assert_eq!(config.n_factors, 4);
    assert_eq!(config.geo_weight, 0.0);
    assert_eq!(config.n_epochs, 20);
    assert_eq!(config.schema, ColumnSchema::default());

    let json = serde_json::to_string(&config).expect("serializable");
    let back: GeoRecommenderConfig = serde_json::from_str(&json).expect("round trip");
    assert_eq!(back, config);
}

#[test]
fn test_validate_rejects_bad_values() {
    let bad = [
        config().with_n_epochs(0),
        config().with_geo_weight(-0.1),
        config().with_cultural_weight(f32::NAN),
        config().with_learning_rate(0.0),
        config().with_regularization(-1.0),
        config().with_rating_bounds(5.0, 1.0),
        config().with_early_stopping(f32::INFINITY, 2),
    ];
    for c in bad {
        assert!(c.validate().is_err(), "{c:?} should be rejected");
    }
}

#[test]
fn test_recommender_is_send_sync() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<GeoRecommender>();
}
