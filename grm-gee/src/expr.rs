//! Builders for Earth Engine REST expression graphs.
//!
//! The service evaluates a JSON tree of `functionInvocationValue` /
//! `constantValue` nodes. These helpers assemble the handful of shapes the
//! query clients need; nothing here talks to the network.

use chrono::NaiveDate;
use grm_core::geometry::RegionGeometry;
use grm_core::interval::DATE_FORMAT;
use serde_json::{json, Value};

fn invoke(function: &str, arguments: Value) -> Value {
    json!({
        "functionInvocationValue": {
            "functionName": function,
            "arguments": arguments,
        }
    })
}

pub fn constant(value: Value) -> Value {
    json!({ "constantValue": value })
}

fn date_str(date: NaiveDate) -> Value {
    constant(json!(date.format(DATE_FORMAT).to_string()))
}

/// Region as the service's geometry constructors expect it.
pub fn geometry(region: &RegionGeometry) -> Value {
    let (function, coords) = match region {
        RegionGeometry::Polygon(_) => ("GeometryConstructors.Polygon", region.coordinates_json()),
        RegionGeometry::Point(_) => ("GeometryConstructors.Point", region.coordinates_json()),
    };
    invoke(function, json!({ "coordinates": constant(coords) }))
}

pub fn image_collection(dataset: &str) -> Value {
    invoke("ImageCollection.load", json!({ "id": constant(json!(dataset)) }))
}

pub fn load_image(asset_id: &str) -> Value {
    invoke("Image.load", json!({ "id": constant(json!(asset_id)) }))
}

pub fn filter_date(collection: Value, start: NaiveDate, end: NaiveDate) -> Value {
    let filter = invoke(
        "Filter.date",
        json!({ "start": date_str(start), "end": date_str(end) }),
    );
    invoke(
        "Collection.filter",
        json!({ "collection": collection, "filter": filter }),
    )
}

pub fn filter_bounds(collection: Value, region: &RegionGeometry) -> Value {
    let filter = invoke("Filter.bounds", json!({ "geometry": geometry(region) }));
    invoke(
        "Collection.filter",
        json!({ "collection": collection, "filter": filter }),
    )
}

pub fn filter_cloud_below(collection: Value, threshold_pct: f64) -> Value {
    let filter = invoke(
        "Filter.lessThan",
        json!({
            "leftField": constant(json!("CLOUDY_PIXEL_PERCENTAGE")),
            "rightValue": constant(json!(threshold_pct)),
        }),
    );
    invoke(
        "Collection.filter",
        json!({ "collection": collection, "filter": filter }),
    )
}

/// Least-cloudy-first ordering with a result cap. The service's sort is
/// stable, so ties keep catalog order and selection stays deterministic.
pub fn sort_by_cloud_and_limit(collection: Value, limit: u32) -> Value {
    invoke(
        "Collection.limit",
        json!({
            "collection": collection,
            "limit": constant(json!(limit)),
            "key": constant(json!("CLOUDY_PIXEL_PERCENTAGE")),
            "ascending": constant(json!(true)),
        }),
    )
}

pub fn collection_size(collection: Value) -> Value {
    invoke("Collection.size", json!({ "collection": collection }))
}

pub fn collection_mosaic(collection: Value) -> Value {
    invoke("ImageCollection.mosaic", json!({ "collection": collection }))
}

pub fn collection_mean(collection: Value) -> Value {
    invoke("ImageCollection.mean", json!({ "collection": collection }))
}

/// Per-pixel normalized difference of two bands, renamed to `name`.
pub fn normalized_difference(image: Value, band_a: &str, band_b: &str, name: &str) -> Value {
    let nd = invoke(
        "Image.normalizedDifference",
        json!({
            "input": image,
            "bandNames": constant(json!([band_a, band_b])),
        }),
    );
    invoke(
        "Image.rename",
        json!({ "input": nd, "names": constant(json!([name])) }),
    )
}

pub fn add_bands(image: Value, bands: Value) -> Value {
    invoke("Image.addBands", json!({ "dstImg": image, "srcImg": bands }))
}

pub fn clip(image: Value, region: &RegionGeometry) -> Value {
    invoke("Image.clip", json!({ "input": image, "geometry": geometry(region) }))
}

pub fn mean_reducer() -> Value {
    invoke("Reducer.mean", json!({}))
}

/// mean + stdDev + minMax with shared inputs, the combination used for
/// water-index statistics.
pub fn stats_reducer() -> Value {
    let mean_std = invoke(
        "Reducer.combine",
        json!({
            "reducer1": invoke("Reducer.mean", json!({})),
            "reducer2": invoke("Reducer.stdDev", json!({})),
            "sharedInputs": constant(json!(true)),
        }),
    );
    invoke(
        "Reducer.combine",
        json!({
            "reducer1": mean_std,
            "reducer2": invoke("Reducer.minMax", json!({})),
            "sharedInputs": constant(json!(true)),
        }),
    )
}

pub fn reduce_region(
    image: Value,
    reducer: Value,
    region: &RegionGeometry,
    scale_m: f64,
    best_effort: bool,
) -> Value {
    invoke(
        "Image.reduceRegion",
        json!({
            "image": image,
            "reducer": reducer,
            "geometry": geometry(region),
            "scale": constant(json!(scale_m)),
            "bestEffort": constant(json!(best_effort)),
            "maxPixels": constant(json!(1e9)),
        }),
    )
}

/// RGB or single-band visualization for thumbnail rendering.
pub fn visualize(
    image: Value,
    bands: &[&str],
    min: f64,
    max: f64,
    gamma: Option<f64>,
    palette: Option<&[&str]>,
) -> Value {
    let mut arguments = json!({
        "image": image,
        "bands": constant(json!(bands)),
        "min": constant(json!([min])),
        "max": constant(json!([max])),
    });
    if let Some(g) = gamma {
        arguments["gamma"] = constant(json!([g]));
    }
    if let Some(p) = palette {
        arguments["palette"] = constant(json!(p));
    }
    invoke("Image.visualize", arguments)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_filtered_collection_shape() {
        let region =
            RegionGeometry::polygon(vec![[83.0, 25.2], [83.0, 25.4], [83.3, 25.4]]).unwrap();
        let expr = filter_cloud_below(
            filter_bounds(
                filter_date(image_collection("COPERNICUS/S2_SR"), d(2020, 1, 1), d(2020, 4, 1)),
                &region,
            ),
            10.0,
        );
        let invocation = &expr["functionInvocationValue"];
        assert_eq!(invocation["functionName"], "Collection.filter");
        let filter = &invocation["arguments"]["filter"]["functionInvocationValue"];
        assert_eq!(filter["functionName"], "Filter.lessThan");
        assert_eq!(
            filter["arguments"]["leftField"]["constantValue"],
            "CLOUDY_PIXEL_PERCENTAGE"
        );
    }

    #[test]
    fn test_geometry_uses_closed_ring() {
        let region =
            RegionGeometry::polygon(vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0]]).unwrap();
        let expr = geometry(&region);
        let coords = &expr["functionInvocationValue"]["arguments"]["coordinates"]["constantValue"];
        assert_eq!(coords[0].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_stats_reducer_combines_three() {
        let expr = stats_reducer();
        let outer = &expr["functionInvocationValue"];
        assert_eq!(outer["functionName"], "Reducer.combine");
        assert_eq!(
            outer["arguments"]["reducer2"]["functionInvocationValue"]["functionName"],
            "Reducer.minMax"
        );
    }
}
