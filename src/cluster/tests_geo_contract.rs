// Contract tests for GeoClusterer: coverage, non-empty clusters,
// determinism, nearest-center assignment and the clamped k.

use super::*;

fn two_cities() -> Vec<(f32, f32)> {
    vec![
        (55.751, 37.618),
        (55.760, 37.620),
        (55.740, 37.600),
        (40.712, -74.006),
        (40.730, -73.990),
        (40.700, -74.010),
    ]
}

fn fitted(points: &[(f32, f32)], k: usize) -> GeoClusterer {
    let mut clusterer = GeoClusterer::new(k);
    clusterer.fit_points(points).expect("fit succeeds");
    clusterer
}

#[test]
fn falsify_sizes_sum_to_row_count() {
    let mut points = two_cities();
    // Duplicates count once per row.
    points.push((55.751, 37.618));
    points.push((55.751, 37.618));
    let clusterer = fitted(&points, 3);

    assert_eq!(clusterer.sizes().iter().sum::<usize>(), points.len());
    assert_eq!(clusterer.labels().len(), points.len());
}

#[test]
fn falsify_no_empty_clusters() {
    for k in 1..=6 {
        let clusterer = fitted(&two_cities(), k);
        assert_eq!(clusterer.n_clusters(), k);
        for summary in clusterer.summaries() {
            assert!(
                summary.size >= 1,
                "cluster {} is empty with k={k}",
                summary.id
            );
        }
    }
}

#[test]
fn falsify_separates_cities() {
    let clusterer = fitted(&two_cities(), 2);
    let labels = clusterer.labels();
    assert_eq!(labels[0], labels[1]);
    assert_eq!(labels[1], labels[2]);
    assert_eq!(labels[3], labels[4]);
    assert_eq!(labels[4], labels[5]);
    assert_ne!(labels[0], labels[3]);
}

#[test]
fn falsify_deterministic_refit() {
    let a = fitted(&two_cities(), 3);
    let b = fitted(&two_cities(), 3);
    assert_eq!(a.centers(), b.centers());
    assert_eq!(a.labels(), b.labels());
    assert_eq!(a.sizes(), b.sizes());
}

#[test]
fn falsify_order_independent_seeding() {
    let mut reversed = two_cities();
    reversed.reverse();
    let a = fitted(&two_cities(), 2);
    let b = fitted(&reversed, 2);
    for (x, y) in a.summaries().iter().zip(b.summaries().iter()) {
        assert!((x.center.0 - y.center.0).abs() < 1e-4);
        assert!((x.center.1 - y.center.1).abs() < 1e-4);
        assert_eq!(x.size, y.size);
    }
}

#[test]
fn falsify_assignment_is_nearest_center() {
    let clusterer = fitted(&two_cities(), 2);
    let centers = clusterer.centers().expect("fitted");
    for &(lat, lon) in &two_cities() {
        let assigned = clusterer.assign(lat, lon).expect("fitted");
        let d_assigned = centers.row_distance_sq(assigned, &[lat, lon]);
        for c in 0..centers.n_rows() {
            assert!(d_assigned <= centers.row_distance_sq(c, &[lat, lon]) + 1e-6);
        }
    }
}

#[test]
fn falsify_tie_goes_to_lowest_id() {
    let clusterer = fitted(&[(0.0, 0.0), (0.0, 2.0)], 2);
    // (0, 1) is equidistant from both centers.
    let low = clusterer
        .summaries()
        .iter()
        .min_by(|a, b| a.center.1.total_cmp(&b.center.1))
        .map(|s| s.id)
        .expect("two clusters");
    assert_eq!(low, 0);
    assert_eq!(clusterer.assign(0.0, 1.0), Some(0));
}

#[test]
fn falsify_k_clamped_to_distinct_points() {
    let points = [(1.0, 1.0), (1.0, 1.0), (2.0, 2.0)];
    let clusterer = fitted(&points, 5);
    assert_eq!(clusterer.requested_clusters(), 5);
    assert_eq!(clusterer.n_clusters(), 2);
    assert_eq!(clusterer.sizes(), &[2, 1]);
}

#[test]
fn falsify_single_cluster_center_is_mean() {
    let clusterer = fitted(&[(1.0, 2.0), (3.0, 4.0), (5.0, 6.0)], 1);
    let summary = clusterer.summaries()[0];
    assert!((summary.center.0 - 3.0).abs() < 1e-5);
    assert!((summary.center.1 - 4.0).abs() < 1e-5);
    assert_eq!(summary.size, 3);
}

#[test]
fn falsify_predict_matches_assign() {
    let clusterer = fitted(&two_cities(), 2);
    let probe = Matrix::from_vec(2, 2, vec![55.0, 37.0, 41.0, -74.0]).expect("2x2");
    let labels = clusterer.predict(&probe);
    assert_eq!(Some(labels[0]), clusterer.assign(55.0, 37.0));
    assert_eq!(Some(labels[1]), clusterer.assign(41.0, -74.0));
}

#[test]
fn test_unfitted_state() {
    let clusterer = GeoClusterer::new(4);
    assert!(!clusterer.is_fitted());
    assert_eq!(clusterer.n_clusters(), 4);
    assert_eq!(clusterer.assign(0.0, 0.0), None);
    assert!(clusterer.summaries().is_empty());
}

#[test]
fn test_fit_errors() {
    assert!(matches!(
        GeoClusterer::new(2).fit_points(&[]),
        Err(GeoRecError::EmptyDataset { .. })
    ));
    assert!(matches!(
        GeoClusterer::new(0).fit_points(&[(0.0, 0.0)]),
        Err(GeoRecError::InvalidHyperparameter { .. })
    ));
    let three_cols = Matrix::from_vec(1, 3, vec![0.0, 0.0, 0.0]).expect("1x3");
    assert!(matches!(
        GeoClusterer::new(1).fit(&three_cols),
        Err(GeoRecError::DimensionMismatch { .. })
    ));
}

#[test]
fn test_builders() {
    let clusterer = GeoClusterer::new(3).with_max_iter(10).with_tol(1e-3);
    assert_eq!(clusterer.max_iter, 10);
    assert!((clusterer.tol - 1e-3).abs() < 1e-9);
}
