//! Preset Files
//!
//! A preset is a JSON array with one object per segment:
//!
//! ```json
//! [{"startPos":[0.0,0.0],"endPos":[0.02,0.0],"strokeColor":[1.0,0.0,0.0,1.0],"radius":0.01,"strokeType":0}]
//! ```
//!
//! Positions are rounded to three decimals on export. Importing replaces the
//! whole store; a preset that fails to parse or validate leaves it untouched.

use serde::{Deserialize, Serialize};

use crate::brush::BrushType;
use crate::error::CanvasError;
use crate::segment::Segment;
use crate::store::StrokeStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PresetSegment {
    pub start_pos: [f32; 2],
    pub end_pos: [f32; 2],
    pub stroke_color: [f32; 4],
    pub radius: f32,
    pub stroke_type: u32,
}

impl PresetSegment {
    fn from_segment(segment: &Segment) -> Self {
        Self {
            start_pos: segment.start.map(round3),
            end_pos: segment.end.map(round3),
            stroke_color: segment.color,
            radius: segment.radius,
            stroke_type: segment.brush_type.as_u32(),
        }
    }

    fn to_segment(&self) -> Result<Segment, CanvasError> {
        let brush_type = BrushType::try_from(self.stroke_type)?;
        let finite = self
            .start_pos
            .iter()
            .chain(&self.end_pos)
            .chain(&self.stroke_color)
            .chain(std::iter::once(&self.radius))
            .all(|v| v.is_finite());
        if !finite {
            return Err(CanvasError::Preset("non-finite value in segment".to_string()));
        }
        Ok(Segment::new(
            self.start_pos,
            self.end_pos,
            self.stroke_color,
            self.radius,
            brush_type,
        ))
    }
}

fn round3(value: f32) -> f32 {
    (value * 1000.0).round() / 1000.0
}

/// Serialize segments to preset JSON
pub fn to_json(segments: &[Segment]) -> Result<String, CanvasError> {
    let preset: Vec<PresetSegment> = segments.iter().map(PresetSegment::from_segment).collect();
    Ok(serde_json::to_string(&preset)?)
}

/// Parse preset JSON into segments, validating every entry
pub fn from_json(text: &str) -> Result<Vec<Segment>, CanvasError> {
    let preset: Vec<PresetSegment> = serde_json::from_str(text)?;
    preset
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            entry
                .to_segment()
                .map_err(|e| CanvasError::Preset(format!("segment {}: {}", i, e)))
        })
        .collect()
}

/// The store's visible segments as preset JSON
pub fn export_store(store: &StrokeStore) -> Result<String, CanvasError> {
    to_json(&store.export_snapshot())
}

/// Replace the store contents with a preset
pub fn import_store(store: &mut StrokeStore, text: &str) -> Result<usize, CanvasError> {
    let segments = from_json(text)?;
    let count = segments.len();
    store.import_snapshot(segments)?;
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SEGMENTS: &str = r#"[{"startPos":[0.0,0.0],"endPos":[0.02,0.0],"strokeColor":[1.0,0.0,0.0,1.0],"radius":0.01,"strokeType":0},{"startPos":[0.02,0.0],"endPos":[0.04,0.125],"strokeColor":[0.0,0.0,1.0,0.5],"radius":0.02,"strokeType":2}]"#;

    #[test]
    fn test_import_then_export_matches_input() {
        let mut store = StrokeStore::new(100, 10);
        assert_eq!(import_store(&mut store, TWO_SEGMENTS).unwrap(), 2);
        assert_eq!(store.instance_count(), 2);
        assert_eq!(export_store(&store).unwrap(), TWO_SEGMENTS);
    }

    #[test]
    fn test_export_rounds_positions() {
        let segment = Segment::new([0.12345, -0.98765], [0.5, 0.0004], [0.0, 0.0, 0.0, 1.0], 0.01, BrushType::Stamp);
        let parsed: Vec<PresetSegment> = serde_json::from_str(&to_json(&[segment]).unwrap()).unwrap();
        assert_eq!(parsed[0].start_pos, [0.123, -0.988]);
        assert_eq!(parsed[0].end_pos, [0.5, 0.0]);
        assert_eq!(parsed[0].stroke_type, 1);
    }

    #[test]
    fn test_round_trip_through_store() {
        let mut store = StrokeStore::new(100, 10);
        store.begin_gesture();
        for i in 0..5 {
            let a = [i as f32 * 0.125, 0.25];
            let b = [(i + 1) as f32 * 0.125, 0.25];
            store
                .append(Segment::new(a, b, [0.25, 0.5, 0.75, 1.0], 0.015, BrushType::Airbrush))
                .unwrap();
        }
        store.end_gesture();

        let json = export_store(&store).unwrap();
        let mut restored = StrokeStore::new(100, 10);
        import_store(&mut restored, &json).unwrap();
        assert_eq!(restored.export_snapshot(), store.export_snapshot());
    }

    #[test]
    fn test_malformed_json_leaves_store_unchanged() {
        let mut store = StrokeStore::new(100, 10);
        import_store(&mut store, TWO_SEGMENTS).unwrap();

        for bad in [
            "{not json",
            r#"[{"startPos":[0.0,0.0]}]"#,
            r#"[{"startPos":[0.0,0.0],"endPos":[0.1,0.0],"strokeColor":[1.0,0.0,0.0,1.0],"radius":0.01,"strokeType":9}]"#,
        ] {
            let result = import_store(&mut store, bad);
            assert!(matches!(result, Err(CanvasError::Preset(_))), "{}", bad);
            assert_eq!(store.instance_count(), 2);
        }
    }

    #[test]
    fn test_empty_preset_clears_store() {
        let mut store = StrokeStore::new(100, 10);
        import_store(&mut store, TWO_SEGMENTS).unwrap();
        assert_eq!(import_store(&mut store, "[]").unwrap(), 0);
        assert_eq!(store.instance_count(), 0);
    }
}
