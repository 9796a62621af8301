use crate::event::EventKind;

/// Transparency of the liquid-crystal goggles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GoggleState {
    #[default]
    Opaque,
    Transparent,
}

impl GoggleState {
    /// Output level driven on the goggle lines; transparent is high.
    pub fn line_level(&self) -> bool {
        matches!(self, GoggleState::Transparent)
    }

    pub fn event_kind(&self) -> EventKind {
        match self {
            GoggleState::Opaque => EventKind::GogglesOpaque,
            GoggleState::Transparent => EventKind::GogglesTransparent,
        }
    }
}

/// Interpreted infrared sensor sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorReading {
    Present,
    Absent,
}

impl SensorReading {
    /// Maps a raw line level given the level that means "finger present".
    pub fn from_level(level: bool, present_level: bool) -> Self {
        if level == present_level {
            SensorReading::Present
        } else {
            SensorReading::Absent
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, SensorReading::Present)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_drives_lines_high() {
        assert!(GoggleState::Transparent.line_level());
        assert!(!GoggleState::Opaque.line_level());
        assert_eq!(GoggleState::default(), GoggleState::Opaque);
    }

    #[test]
    fn active_low_sensor_inverts_presence() {
        assert_eq!(SensorReading::from_level(true, true), SensorReading::Present);
        assert_eq!(SensorReading::from_level(true, false), SensorReading::Absent);
        assert!(SensorReading::from_level(false, false).is_present());
    }
}
