//! ASCE 7 seismic design coefficients per frame system

use serde::{Deserialize, Serialize};

/// Response modification, deflection amplification and overstrength factors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeismicParameters {
    /// Response modification coefficient R
    pub r: f64,
    /// Deflection amplification factor Cd
    pub cd: f64,
    /// Overstrength factor Ω0
    pub omega0: f64,
    /// Seismic force-resisting system description
    pub sfrs: String,
}

impl SeismicParameters {
    /// Coefficients for a frame-system label; `None` for unknown systems
    pub fn for_frame_system(frame_system: &str) -> Option<Self> {
        let (r, cd, omega0, sfrs) = match frame_system.trim().to_ascii_uppercase().as_str() {
            "MOMENT" => (8.0, 5.5, 3.0, "Special moment frame"),
            "BRACED" => (6.0, 5.0, 2.0, "Special concentrically braced frame"),
            "DUAL" => (7.0, 5.5, 2.5, "Dual system"),
            "TRUSS" => (3.0, 3.0, 3.0, "Truss system"),
            "CANTILEVER" => (2.5, 2.5, 2.0, "Cantilever column system"),
            _ => return None,
        };
        Some(Self {
            r,
            cd,
            omega0,
            sfrs: sfrs.to_string(),
        })
    }
}
