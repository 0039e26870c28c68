// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2026 Vallés Puig, Ramon

//! Life-event / dasha-period agreement.
//!
//! For every reported life event, the running Vimshotari mahadasha and
//! antardasha lords at the event date are cross-referenced against a
//! significator table: an event counts as aligned when either lord
//! signifies its kind.  Zero events is a vacuous pass — absence of
//! evidence is reduced coverage, not failure.

use serde::{Deserialize, Serialize};

use crate::calendar;
use crate::dasha::{Graha, VimshottariDasha};
use crate::error::Result;

/// Category of a reported life event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Marriage,
    ChildBirth,
    Career,
    Education,
    Relocation,
    HealthCrisis,
    Bereavement,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            EventKind::Marriage => "marriage",
            EventKind::ChildBirth => "child_birth",
            EventKind::Career => "career",
            EventKind::Education => "education",
            EventKind::Relocation => "relocation",
            EventKind::HealthCrisis => "health_crisis",
            EventKind::Bereavement => "bereavement",
        };
        write!(f, "{label}")
    }
}

/// Planets whose periods classically signify an event kind.
pub fn significators(kind: EventKind) -> &'static [Graha] {
    match kind {
        EventKind::Marriage => &[Graha::Venus, Graha::Jupiter, Graha::Moon],
        EventKind::ChildBirth => &[Graha::Jupiter, Graha::Moon],
        EventKind::Career => &[Graha::Saturn, Graha::Sun, Graha::Mercury, Graha::Jupiter],
        EventKind::Education => &[Graha::Mercury, Graha::Jupiter],
        EventKind::Relocation => &[Graha::Rahu, Graha::Saturn, Graha::Moon],
        EventKind::HealthCrisis => &[Graha::Saturn, Graha::Mars, Graha::Rahu, Graha::Ketu],
        EventKind::Bereavement => &[Graha::Saturn, Graha::Ketu],
    }
}

/// One reported life event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifeEvent {
    /// Event date, `"YYYY-MM-DD"`.
    pub date: String,
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// The per-event judgement, kept for reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventAlignment {
    pub date: String,
    pub kind: EventKind,
    pub mahadasha_lord: Option<Graha>,
    pub antardasha_lord: Option<Graha>,
    pub aligned: bool,
}

/// The event-fit verdict.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventFitMetric {
    pub total_events: usize,
    pub aligned_events: usize,
    /// Aligned percentage; 100 when no events were supplied.
    pub percentage: f64,
    pub threshold_percentage: f64,
    pub within_threshold: bool,
    pub details: Vec<EventAlignment>,
}

/// Judge every event against the dasha timeline.
pub fn analyze_event_fit(
    events: &[LifeEvent],
    dasha: &VimshottariDasha,
    threshold_percentage: f64,
) -> Result<EventFitMetric> {
    let mut details = Vec::with_capacity(events.len());
    let mut aligned_events = 0;

    for event in events {
        let civil = calendar::parse_civil(&event.date)?;
        // Judged at local noon; dasha periods are far coarser than hours.
        let jd = calendar::civil_to_jd(&calendar::CivilDateTime {
            hour: 12,
            minute: 0,
            second: 0.0,
            ..civil
        });
        let lords = dasha.lords_at(jd);
        let aligned = lords
            .map(|(maha, antar)| {
                let wanted = significators(event.kind);
                wanted.contains(&maha) || wanted.contains(&antar)
            })
            .unwrap_or(false);
        if aligned {
            aligned_events += 1;
        }
        details.push(EventAlignment {
            date: event.date.clone(),
            kind: event.kind,
            mahadasha_lord: lords.map(|(maha, _)| maha),
            antardasha_lord: lords.map(|(_, antar)| antar),
            aligned,
        });
    }

    let total_events = events.len();
    let percentage = if total_events == 0 {
        100.0
    } else {
        aligned_events as f64 / total_events as f64 * 100.0
    };

    Ok(EventFitMetric {
        total_events,
        aligned_events,
        percentage,
        threshold_percentage,
        within_threshold: percentage >= threshold_percentage,
        details,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Moon at 0° Ashwini at J2000: Ketu 7y, Venus 20y, Sun 6y, Moon 10y…
    fn dasha() -> VimshottariDasha {
        VimshottariDasha::from_natal_moon(0.0, 2_451_545.0)
    }

    fn event(date: &str, kind: EventKind) -> LifeEvent {
        LifeEvent {
            date: date.to_string(),
            kind,
            description: None,
        }
    }

    #[test]
    fn zero_events_pass_vacuously() {
        let metric = analyze_event_fit(&[], &dasha(), 80.0).unwrap();
        assert_eq!(metric.percentage, 100.0);
        assert!(metric.within_threshold);
        assert_eq!(metric.total_events, 0);
    }

    #[test]
    fn venus_mahadasha_marriage_aligns() {
        // Venus mahadasha runs ~2007–2027 for this chart.
        let metric = analyze_event_fit(
            &[event("2015-06-15", EventKind::Marriage)],
            &dasha(),
            80.0,
        )
        .unwrap();
        assert_eq!(metric.aligned_events, 1);
        assert_eq!(metric.details[0].mahadasha_lord, Some(Graha::Venus));
        assert!(metric.within_threshold);
    }

    #[test]
    fn misfit_event_fails_threshold() {
        // Bereavement wants Saturn/Ketu; 2012 sits in the Venus
        // mahadasha under a Moon antardasha, so neither lord signifies.
        let metric = analyze_event_fit(
            &[event("2012-01-01", EventKind::Bereavement)],
            &dasha(),
            80.0,
        )
        .unwrap();
        assert_eq!(metric.total_events, 1);
        assert_eq!(metric.aligned_events, 0);
        assert_eq!(metric.details[0].mahadasha_lord, Some(Graha::Venus));
        assert_eq!(metric.details[0].antardasha_lord, Some(Graha::Moon));
        assert!(!metric.within_threshold);
    }

    #[test]
    fn event_outside_timeline_is_unaligned() {
        let metric = analyze_event_fit(
            &[event("1800-01-01", EventKind::Career)],
            &dasha(),
            80.0,
        )
        .unwrap();
        assert_eq!(metric.aligned_events, 0);
        assert!(metric.details[0].mahadasha_lord.is_none());
        assert!(!metric.within_threshold);
    }

    #[test]
    fn unparseable_event_date_is_an_error() {
        let result = analyze_event_fit(
            &[event("sometime in spring", EventKind::Marriage)],
            &dasha(),
            80.0,
        );
        assert!(result.is_err());
    }

    #[test]
    fn mixed_events_compute_percentage() {
        let events = vec![
            event("2015-06-15", EventKind::Marriage), // Venus mahadasha → aligned
            event("1800-01-01", EventKind::Career),   // outside timeline → not
        ];
        let metric = analyze_event_fit(&events, &dasha(), 80.0).unwrap();
        assert_eq!(metric.total_events, 2);
        assert_eq!(metric.aligned_events, 1);
        assert_eq!(metric.percentage, 50.0);
        assert!(!metric.within_threshold);
    }

    #[test]
    fn significator_tables_are_nonempty() {
        for kind in [
            EventKind::Marriage,
            EventKind::ChildBirth,
            EventKind::Career,
            EventKind::Education,
            EventKind::Relocation,
            EventKind::HealthCrisis,
            EventKind::Bereavement,
        ] {
            assert!(!significators(kind).is_empty());
        }
    }
}
