//! Room swap recommendations for over-capacity classes.

use crate::class::Class;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRecommendation {
    pub crowded_id: i64,
    pub crowded_room: String,
    pub target_id: i64,
    pub target_room: String,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossSlotRecommendation {
    pub crowded_id: i64,
    pub crowded_room: String,
    pub target_id: i64,
    pub target_room: String,
    pub target_slot: String,
    pub reason: String,
}

/// Recommendations keyed by the crowded class's meeting pattern.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRecommendations {
    pub same_slot_swaps: BTreeMap<String, Vec<SwapRecommendation>>,
    pub cross_slot_recommendations: BTreeMap<String, Vec<CrossSlotRecommendation>>,
}

impl SwapRecommendations {
    pub fn is_empty(&self) -> bool {
        self.same_slot_swaps.is_empty() && self.cross_slot_recommendations.is_empty()
    }
}

fn reason(crowded: &Class, target: &Class) -> String {
    format!(
        "{} students need {}-seat room",
        crowded.enrollment, target.max_enrollment
    )
}

/// Pairs every overfull class with a larger room.
///
/// Within a timeslot the most crowded class picks first, taking the class with the most
/// spare seats whose room holds its enrollment. Classes that find nothing in their own
/// slot are matched against other slots, where both rooms must hold the other class and
/// the tightest fit wins. No class takes part in more than one recommendation.
pub fn recommend_swaps(classes: &[Class]) -> SwapRecommendations {
    let mut slots: BTreeMap<&str, Vec<&Class>> = BTreeMap::new();
    for class in classes {
        slots
            .entry(class.meeting_pattern.as_str())
            .or_default()
            .push(class);
    }

    let mut result = SwapRecommendations::default();
    let mut used: HashSet<i64> = HashSet::new();
    let mut unresolved: Vec<&Class> = Vec::new();

    for (slot, members) in &slots {
        let mut overfull: Vec<&Class> = members
            .iter()
            .copied()
            .filter(|class| class.is_overfull())
            .collect();
        if overfull.is_empty() {
            continue;
        }
        overfull.sort_by(|a, b| b.enrollment.cmp(&a.enrollment));

        let mut by_spare: Vec<&Class> = members.clone();
        by_spare.sort_by(|a, b| b.spare_seats().cmp(&a.spare_seats()));

        let mut recommendations = Vec::new();
        for crowded in overfull {
            if used.contains(&crowded.id) {
                continue;
            }
            let target = by_spare.iter().copied().find(|candidate| {
                candidate.id != crowded.id
                    && !used.contains(&candidate.id)
                    && !candidate.room.is_empty()
                    && candidate.room != crowded.room
                    && candidate.max_enrollment >= crowded.enrollment
            });
            match target {
                Some(target) => {
                    used.insert(crowded.id);
                    used.insert(target.id);
                    recommendations.push(SwapRecommendation {
                        crowded_id: crowded.id,
                        crowded_room: crowded.room.clone(),
                        target_id: target.id,
                        target_room: target.room.clone(),
                        reason: reason(crowded, target),
                    });
                }
                None => unresolved.push(crowded),
            }
        }
        if !recommendations.is_empty() {
            result
                .same_slot_swaps
                .insert((*slot).to_string(), recommendations);
        }
    }

    for crowded in unresolved {
        if used.contains(&crowded.id) {
            continue;
        }
        let target = classes
            .iter()
            .filter(|candidate| {
                candidate.meeting_pattern != crowded.meeting_pattern
                    && !used.contains(&candidate.id)
                    && !candidate.is_remote()
                    && !candidate.room.is_empty()
                    && candidate.room != crowded.room
                    && candidate.max_enrollment >= crowded.enrollment
                    && crowded.max_enrollment >= candidate.enrollment
            })
            .min_by_key(|candidate| (candidate.spare_seats(), candidate.id));
        if let Some(target) = target {
            used.insert(crowded.id);
            used.insert(target.id);
            result
                .cross_slot_recommendations
                .entry(crowded.meeting_pattern.clone())
                .or_default()
                .push(CrossSlotRecommendation {
                    crowded_id: crowded.id,
                    crowded_room: crowded.room.clone(),
                    target_id: target.id,
                    target_room: target.room.clone(),
                    target_slot: target.meeting_pattern.clone(),
                    reason: reason(crowded, target),
                });
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(id: i64, room: &str, slot: &str, enrollment: i64, max: i64) -> Class {
        Class {
            id,
            term: "Fall 2025".into(),
            course_number: format!("CSCI {id}"),
            section: "001".into(),
            course_title: "Course".into(),
            room: room.into(),
            meeting_pattern: slot.into(),
            enrollment,
            max_enrollment: max,
        }
    }

    #[test]
    fn empty_input_recommends_nothing() {
        let result = recommend_swaps(&[]);
        assert!(result.is_empty());
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["same_slot_swaps"], serde_json::json!({}));
    }

    #[test]
    fn overfull_class_swaps_with_roomier_class_in_same_slot() {
        let classes = vec![
            class(1, "PKI 160", "TTh 9:00-10:15", 35, 30),
            class(2, "PKI 170", "TTh 9:00-10:15", 15, 40),
            class(3, "PKI 180", "MW 11:30-12:45", 25, 30),
        ];
        let result = recommend_swaps(&classes);
        let swaps = &result.same_slot_swaps["TTh 9:00-10:15"];
        assert_eq!(swaps.len(), 1);
        assert_eq!(swaps[0].crowded_id, 1);
        assert_eq!(swaps[0].target_id, 2);
        assert_eq!(swaps[0].target_room, "PKI 170");
        assert_eq!(swaps[0].reason, "35 students need 40-seat room");
        assert!(result.cross_slot_recommendations.is_empty());
    }

    #[test]
    fn most_crowded_class_picks_first_and_targets_are_not_reused() {
        let classes = vec![
            class(1, "PKI 150", "MW 9:00", 32, 30),
            class(2, "PKI 151", "MW 9:00", 45, 40),
            class(3, "PKI 152", "MW 9:00", 10, 60),
            class(4, "PKI 153", "MW 9:00", 5, 35),
        ];
        let result = recommend_swaps(&classes);
        let swaps = &result.same_slot_swaps["MW 9:00"];
        assert_eq!(swaps.len(), 2);
        assert_eq!((swaps[0].crowded_id, swaps[0].target_id), (2, 3));
        assert_eq!((swaps[1].crowded_id, swaps[1].target_id), (1, 4));
    }

    #[test]
    fn falls_back_to_other_timeslots() {
        let classes = vec![
            class(1, "PKI 160", "TTh 9:00-10:15", 35, 30),
            class(2, "PKI 170", "MW 9:00-10:15", 15, 40),
            class(3, "PKI 180", "MW 11:30-12:45", 25, 50),
            class(4, "", "ONLINE", 0, 0),
        ];
        let result = recommend_swaps(&classes);
        assert!(result.same_slot_swaps.is_empty());
        let recs = &result.cross_slot_recommendations["TTh 9:00-10:15"];
        assert_eq!(recs.len(), 1);
        // 40 seats with 25 spare beats 50 seats with 25 spare on id order
        assert_eq!(recs[0].target_id, 2);
        assert_eq!(recs[0].target_slot, "MW 9:00-10:15");
    }

    #[test]
    fn no_room_large_enough_yields_no_recommendation() {
        let classes = vec![
            class(1, "PKI 160", "TTh", 80, 30),
            class(2, "PKI 170", "TTh", 10, 40),
        ];
        assert!(recommend_swaps(&classes).is_empty());
    }

    #[test]
    fn roomless_classes_are_never_targets() {
        let classes = vec![
            class(1, "PKI 160", "MW 9:00", 35, 30),
            class(2, "", "MW 9:00", 5, 90),
            class(3, "PKI 170", "MW 9:00", 20, 40),
        ];
        let result = recommend_swaps(&classes);
        let swaps = &result.same_slot_swaps["MW 9:00"];
        assert_eq!(swaps.len(), 1);
        assert_eq!(swaps[0].target_id, 3);
    }
}
