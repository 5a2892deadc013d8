//! Sample data for local development.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use domain::models::{incident::types, NewCamera, NewIncident};

/// Fewest incidents a seed run generates.
pub const MIN_INCIDENTS: usize = 12;
/// Most incidents a seed run generates.
pub const MAX_INCIDENTS: usize = 21;

pub const SAMPLE_DESCRIPTION: &str = "Sample security incident detected";

pub fn sample_cameras() -> Vec<NewCamera> {
    vec![
        NewCamera::new("Shop Floor A", "North Wing, First Floor"),
        NewCamera::new("Vault", "Basement Level"),
        NewCamera::new("Main Entrance", "Ground Floor, Front"),
        NewCamera::new("Parking Lot", "Outdoor, East Side"),
    ]
}

/// Random incidents spread over the 24 hours before `now`, each lasting
/// 1 to 29 minutes on a random camera. Empty when `camera_ids` is empty.
pub fn sample_incidents<R: Rng>(
    rng: &mut R,
    camera_ids: &[i64],
    now: DateTime<Utc>,
) -> Vec<NewIncident> {
    if camera_ids.is_empty() {
        return Vec::new();
    }

    let count = rng.gen_range(MIN_INCIDENTS..=MAX_INCIDENTS);
    let day_ms = Duration::hours(24).num_milliseconds();

    (0..count)
        .map(|i| {
            let t_start = now - Duration::milliseconds(rng.gen_range(0..day_ms));
            let t_end = t_start + Duration::minutes(rng.gen_range(1..30));
            NewIncident {
                camera_id: camera_ids[rng.gen_range(0..camera_ids.len())],
                incident_type: types::SEEDED[rng.gen_range(0..types::SEEDED.len())].to_string(),
                t_start,
                t_end,
                thumbnail_url: format!(
                    "https://picsum.photos/seed/{}/300/200",
                    now.timestamp_millis() + i as i64
                ),
                resolved: rng.gen_bool(0.5),
                description: SAMPLE_DESCRIPTION.to_string(),
            }
        })
        .collect()
}
