//! Schematic ARGO overlay shown in the map panel next to the conversation.

use shared::domain::FloatStatus;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FloatMarker {
    pub wmo_id: &'static str,
    pub status: FloatStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CurrentIndicator {
    pub heading: &'static str,
    pub speed_m_s: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySummary {
    pub active_floats: u32,
    pub recent_profiles: u32,
    pub bgc_floats: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MapOverlay {
    pub title: &'static str,
    pub region: &'static str,
    pub depth_m: u32,
    pub markers: Vec<FloatMarker>,
    pub currents: Vec<CurrentIndicator>,
    pub summary: QuerySummary,
}

impl MapOverlay {
    pub fn legend(&self) -> [(FloatStatus, &'static str); 3] {
        [
            FloatStatus::Active,
            FloatStatus::RecentData,
            FloatStatus::BgcSensors,
        ]
        .map(|status| (status, status.legend()))
    }

    pub fn markers_with(&self, status: FloatStatus) -> impl Iterator<Item = &FloatMarker> {
        self.markers
            .iter()
            .filter(move |marker| marker.status == status)
    }
}

pub fn argo_overlay() -> MapOverlay {
    let marker = |wmo_id, status| FloatMarker { wmo_id, status };
    MapOverlay {
        title: "ARGO Float Distribution",
        region: "Indian Ocean",
        depth_m: 2000,
        markers: vec![
            marker("WMO_5906468", FloatStatus::Active),
            marker("WMO_2903741", FloatStatus::RecentData),
            marker("WMO_5906469", FloatStatus::BgcSensors),
            marker("WMO_2903742", FloatStatus::Active),
            marker("WMO_5906470", FloatStatus::RecentData),
            marker("WMO_2903743", FloatStatus::BgcSensors),
        ],
        currents: vec![
            CurrentIndicator {
                heading: "→",
                speed_m_s: 0.3,
            },
            CurrentIndicator {
                heading: "↗",
                speed_m_s: 0.5,
            },
        ],
        summary: QuerySummary {
            active_floats: 127,
            recent_profiles: 23,
            bgc_floats: 8,
        },
    }
}
