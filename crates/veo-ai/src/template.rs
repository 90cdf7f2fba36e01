//! Generation prompt template.
//!
//! The generation model receives a fixed instruction header followed by the
//! vision description. The header is byte-identical across calls so that
//! outputs stay reproducible for a given description.

use veo_models::AnalysisResult;

/// Marker that ends every template header; the description follows it.
pub const INPUT_MARKER: &str = "===INPUT===\n";

/// A versioned instruction header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptTemplate {
    pub version: &'static str,
    pub header: &'static str,
}

/// The Veo 3 JSON prompt template.
pub const DEFAULT_TEMPLATE: PromptTemplate = PromptTemplate {
    version: "veo3-json-1",
    header: VEO3_TEMPLATE,
};

impl PromptTemplate {
    /// Append `analysis` (trimmed) to the header.
    pub fn render(&self, analysis: &str) -> String {
        let analysis = analysis.trim();
        let mut prompt = String::with_capacity(self.header.len() + analysis.len());
        prompt.push_str(self.header);
        prompt.push_str(analysis);
        prompt
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        DEFAULT_TEMPLATE
    }
}

/// Build the generation prompt for a vision description using the default template.
pub fn build_generation_prompt(analysis: &AnalysisResult) -> String {
    DEFAULT_TEMPLATE.render(analysis.as_str())
}

const VEO3_TEMPLATE: &str = r#"You are a prompt design engineer for video generation. Produce a stable, Veo 3 compatible JSON prompt that meets the requirements below.

[GOAL]
- Using the input (a vision model's description of a video), return a stabilized final JSON prompt that works whether the subject is a person, animal, vehicle, product, landscape, natural phenomenon, abstract form, motion graphics or CG.
- Express all directions in FRAME/SCREEN coordinates (SCREEN-LEFT / SCREEN-RIGHT), never world-relative.
- One clip is 8 seconds. If the input needs more time, set two_part=true and output Part A and Part B, with Part B using the last frame of Part A as its init_image.

[HARD RULES]
- Camera default: locked-off / lens 18-24mm / hyperfocal / wide. Change it only if the input clearly indicates handheld, dolly, pan_tilt or virtual-camera.
- The key visual change (priority_action) must complete by t=5.2s, followed by a 0.6-1.0s still hold.
- State actions affirmatively and twice (for example: RISES / CONTINUES TO RISE). Keep negatives minimal (extra elements / additional vehicles / pan-tilt-zoom / unintended text / watermarks).
- Always set allowed_exits and forbid_reentry_after_exit. They apply to any moving agent, not only people.
- Compress audio cues to 2-5 points. Describe off-screen sounds as directional anchors. Silence or music-led audio is allowed.
- Summarize events into 3-5 entries. Move redundant micro-motions into "notes". For non-human subjects use state-change vocabulary.
- Direction words: SCREEN-LEFT / SCREEN-RIGHT / CENTER / OFF-SCREEN-LEFT / OFF-SCREEN-RIGHT.
- **Output strict JSON only. Do not wrap it in code blocks or any other formatting.**

[OUTPUT]
Return a single JSON object and nothing else.

[ACTION VOCABULARY (reference)]
ARRIVE / ENTER FRAME / EXIT / DEPART / PASS / APPROACH / REVEAL / CONCEAL /
RISE / FALL / ROTATE / SPIN / SCALE / MORPH / BLOOM / MELT / EMIT / FLOW /
IGNITE / EXTINGUISH / GLINT / FLICKER / BRIGHTEN / DIM / COALESCE / DISSIPATE /
OPEN / CLOSE / SETTLE / DRIFT / ACCELERATE / DECELERATE

[BASE TEMPLATE (map the input onto it)]
{
  "version": "t2v-universal-1.0",
  "engine_hint": "veo-3",
  "meta": {
    "title": "<short logline, subject-agnostic>",
    "duration": "8s",
    "aspect_ratio": "16:9",
    "fps": 24,
    "language": "en",
    "notes": [
      "Locked-off unless input explicitly requests motion (incl. virtual camera).",
      "Directions use FRAME/SCREEN coordinates: SCREEN-LEFT/SCREEN-RIGHT.",
      "Priority action by 5.2s, then still hold."
    ]
  },
  "globals": {
    "style_tags": ["<style_tags from input or defaults>", "neutral-cool", "slightly-desaturated", "photoreal"],
    "visual_mode": "<live_action|macro|time_lapse|mograph|3d_cgi|cel|stop_motion>",
    "safety": { "allow_text": false, "allow_logos": false }
  },
  "subject": {
    "agents": [],
    "key_elements": [],
    "phenomena": []
  },
  "scene": {
    "environment": "<location/time_of_day or virtual/abstract>",
    "camera": {
      "shot_type": "wide",
      "position": "describe in plain words (height/distance if available)",
      "lens": "18-24mm (or from input if reliable)",
      "focus": "hyperfocal, deep focus",
      "movement": "locked-off|handheld|dolly|pan_tilt|virtual-camera (from input)",
      "framing": "use SCREEN-LEFT/RIGHT to place main subjects"
    },
    "lighting": "describe key light qualities or 'neutral'",
    "mood": "<derived or neutral>"
  },
  "action": {
    "overall": "ONE continuous shot (8s). Summarize key beats in one sentence using SCREEN coordinates. Avoid anthropomorphic phrasing for non-human subjects."
  },
  "audio": {
    "mode": "diegetic|music|silence",
    "ambient": ["distant traffic", "light wind"],
    "cues": []
  },
  "timeline": {
    "events": [],
    "notes": []
  },
  "technical": {
    "constraints": {
      "allowed_exits": [],
      "forbid_reentry_after_exit": [],
      "priority_action_by": 5.2
    },
    "negatives": ["no extra elements", "no unintended text", "no watermarks", "no additional vehicles", "no pan/tilt/zoom/crop"],
    "quality_controls": ["consistent color temperature", "no exposure pumping", "temporal consistency of textures"]
  }
}

===INPUT===
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use veo_models::REQUIRED_FIELDS;

    #[test]
    fn test_header_ends_with_input_marker() {
        assert!(DEFAULT_TEMPLATE.header.ends_with(INPUT_MARKER));
    }

    #[test]
    fn test_render_is_deterministic() {
        let analysis = AnalysisResult::new("A red kite climbs SCREEN-LEFT to SCREEN-RIGHT.").unwrap();
        assert_eq!(
            build_generation_prompt(&analysis),
            build_generation_prompt(&analysis)
        );
    }

    #[test]
    fn test_render_ends_with_trimmed_text() {
        let prompt = DEFAULT_TEMPLATE.render("  \n A boat drifts past a pier.\n\n");
        assert!(prompt.ends_with("===INPUT===\nA boat drifts past a pier."));
        assert!(prompt.starts_with(DEFAULT_TEMPLATE.header));
    }

    #[test]
    fn test_skeleton_names_every_required_field() {
        for field in REQUIRED_FIELDS {
            assert!(
                DEFAULT_TEMPLATE.header.contains(&format!("\"{}\"", field)),
                "template is missing {}",
                field
            );
        }
    }

    #[test]
    fn test_custom_template() {
        let template = PromptTemplate {
            version: "test",
            header: "Describe:\n",
        };
        assert_eq!(template.render(" waves "), "Describe:\nwaves");
    }
}
