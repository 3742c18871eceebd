//! Ground-truth comparison
//!
//! Each check reports at most the first divergent record of a response.

use crate::actions::ConditionQuery;
use crate::api::{ConditionResponse, GraphEntry, IsuListEntry, IsuResponse, MeResponse};
use condbench_core::{BenchError, Condition, Device, VirtualUser};

fn compare_condition(
    request: &str,
    index: usize,
    device: &Device,
    expected: &Condition,
    actual: &ConditionResponse,
) -> Option<BenchError> {
    let mismatch = |field: &str, expected: &dyn ToString, actual: &dyn ToString| {
        Some(BenchError::data_mismatch(
            request,
            index,
            field,
            expected.to_string(),
            actual.to_string(),
        ))
    };

    if actual.jia_isu_uuid != expected.device_uuid {
        return mismatch("jia_isu_uuid", &expected.device_uuid, &actual.jia_isu_uuid);
    }
    if actual.isu_name != device.name {
        return mismatch("isu_name", &device.name, &actual.isu_name);
    }
    if actual.timestamp != expected.timestamp {
        return mismatch("timestamp", &expected.timestamp, &actual.timestamp);
    }
    if actual.is_sitting != expected.is_sitting {
        return mismatch("is_sitting", &expected.is_sitting, &actual.is_sitting);
    }
    let condition = expected.condition_string();
    if actual.condition != condition {
        return mismatch("condition", &condition, &actual.condition);
    }
    let level = expected.level().as_str();
    if actual.condition_level != level {
        return mismatch("condition_level", &level, &actual.condition_level);
    }
    if actual.message != expected.message {
        return mismatch("message", &expected.message, &actual.message);
    }
    None
}

/// Compare a condition page with the device's ground truth for the same
/// window, newest first, truncated to the query's limit.
///
/// Readings sharing a timestamp may come back in any order, so each tie
/// group is matched as a multiset. When the limit cuts a group, the page
/// may hold any subset of it.
pub fn verify_conditions(
    request: &str,
    returned: &[ConditionResponse],
    device: &Device,
    query: &ConditionQuery,
) -> Vec<BenchError> {
    let start = query.start_time.unwrap_or(i64::MIN);
    let expected: Vec<&Condition> = device
        .conditions()
        .range(start, query.end_time, query.min_level)
        .take(query.limit)
        .collect();

    let mut index = 0;
    while index < expected.len() {
        let timestamp = expected[index].timestamp;
        let group_len = expected[index..]
            .iter()
            .take_while(|c| c.timestamp == timestamp)
            .count();
        let mut candidates: Vec<&Condition> = device
            .conditions()
            .at(timestamp)
            .filter(|c| c.level() >= query.min_level)
            .collect();

        for position in index..index + group_len {
            let Some(actual) = returned.get(position) else {
                return vec![BenchError::data_mismatch(
                    request,
                    position,
                    "length",
                    format!("more than {}", position),
                    returned.len(),
                )];
            };
            let matched = candidates
                .iter()
                .position(|c| compare_condition(request, position, device, c, actual).is_none());
            match matched {
                Some(found) => {
                    candidates.swap_remove(found);
                }
                None => {
                    let err = candidates
                        .first()
                        .and_then(|c| compare_condition(request, position, device, c, actual))
                        .unwrap_or_else(|| {
                            BenchError::data_mismatch(
                                request,
                                position,
                                "timestamp",
                                format!("no further reading at {}", timestamp),
                                actual.timestamp,
                            )
                        });
                    return vec![err];
                }
            }
        }
        index += group_len;
    }

    if returned.len() > expected.len() {
        return vec![BenchError::data_mismatch(
            request,
            expected.len(),
            "length",
            expected.len(),
            returned.len(),
        )];
    }
    Vec::new()
}

/// The list must hold exactly the user's devices, newest first
pub fn verify_isu_list(request: &str, returned: &[IsuListEntry], user: &VirtualUser) -> Vec<BenchError> {
    let expected: Vec<&Device> = user.devices_newest_first().collect();
    if returned.len() != expected.len() {
        return vec![BenchError::data_mismatch(
            request,
            0,
            "length",
            expected.len(),
            returned.len(),
        )];
    }

    for (index, (device, entry)) in expected.iter().zip(returned).enumerate() {
        if entry.jia_isu_uuid != device.uuid {
            return vec![BenchError::data_mismatch(
                request,
                index,
                "jia_isu_uuid",
                &device.uuid,
                &entry.jia_isu_uuid,
            )];
        }
        if entry.name != device.name {
            return vec![BenchError::data_mismatch(request, index, "name", &device.name, &entry.name)];
        }
        if entry.character != device.character.as_str() {
            return vec![BenchError::data_mismatch(
                request,
                index,
                "character",
                device.character,
                &entry.character,
            )];
        }
        if let Some(id) = device.server_id {
            if entry.id != id {
                return vec![BenchError::data_mismatch(request, index, "id", id, entry.id)];
            }
        }
        // the target may hold readings not yet drained; only check known
        // timestamps, and accept any reading of a tie
        if let Some(latest) = &entry.latest_isu_condition {
            let mut known = device.conditions().at(latest.timestamp).peekable();
            if let Some(&first) = known.peek() {
                if !known.any(|c| compare_condition(request, index, device, c, latest).is_none()) {
                    return compare_condition(request, index, device, first, latest)
                        .into_iter()
                        .collect();
                }
            }
        }
    }
    Vec::new()
}

pub fn verify_isu(request: &str, returned: &IsuResponse, device: &Device) -> Vec<BenchError> {
    let checks: [(&str, String, String); 3] = [
        ("jia_isu_uuid", device.uuid.clone(), returned.jia_isu_uuid.clone()),
        ("name", device.name.clone(), returned.name.clone()),
        ("character", device.character.to_string(), returned.character.clone()),
    ];
    checks
        .into_iter()
        .find(|(_, expected, actual)| expected != actual)
        .map(|(field, expected, actual)| BenchError::data_mismatch(request, 0, field, expected, actual))
        .into_iter()
        .collect()
}

/// Uploaded icons must come back byte for byte
pub fn verify_icon(request: &str, returned: &[u8], device: &Device) -> Vec<BenchError> {
    match &device.image {
        Some(image) if image.as_slice() != returned => vec![BenchError::data_mismatch(
            request,
            0,
            "icon",
            format!("{} bytes md5 {:x}", image.len(), md5::compute(image)),
            format!("{} bytes md5 {:x}", returned.len(), md5::compute(returned)),
        )],
        _ => Vec::new(),
    }
}

pub fn verify_me(request: &str, returned: &MeResponse, user: &VirtualUser) -> Vec<BenchError> {
    if returned.jia_user_id != user.user_id {
        return vec![BenchError::data_mismatch(
            request,
            0,
            "jia_user_id",
            &user.user_id,
            &returned.jia_user_id,
        )];
    }
    Vec::new()
}

/// Hourly buckets must tile the requested day and every reported timestamp
/// inside the drained window must be a known reading of the device
pub fn verify_graph(
    request: &str,
    returned: &[GraphEntry],
    device: &Device,
    day_start: i64,
) -> Vec<BenchError> {
    let known_until = device.conditions().back().map(|c| c.timestamp);

    for (index, entry) in returned.iter().enumerate() {
        let expected_start = day_start + 3600 * index as i64;
        if entry.start_at != expected_start {
            return vec![BenchError::data_mismatch(
                request,
                index,
                "start_at",
                expected_start,
                entry.start_at,
            )];
        }
        for &ts in &entry.condition_timestamps {
            if ts < entry.start_at || ts >= entry.end_at {
                return vec![BenchError::data_mismatch(
                    request,
                    index,
                    "condition_timestamps",
                    format!("within [{}, {})", entry.start_at, entry.end_at),
                    ts,
                )];
            }
            let checkable = known_until.is_some_and(|until| ts < until);
            if checkable && device.conditions().at(ts).next().is_none() {
                return vec![BenchError::data_mismatch(
                    request,
                    index,
                    "condition_timestamps",
                    "a generated reading",
                    ts,
                )];
            }
        }
    }
    Vec::new()
}
