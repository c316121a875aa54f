//! Placeholder screenshots for scenario authoring.
//!
//! Scenarios are judged on coordinates, not pixels, so a screen only needs
//! to be a valid image. Placeholders show the state's position in the
//! scenario and outline its click regions so the author can see them.

use std::fs;
use std::path::PathBuf;

use tracing::info;

use super::framebuffer::{Framebuffer, GLYPH_SIZE};
use crate::error::{HarnessError, HarnessResult};
use crate::scenario::{ScenarioDefinition, StateDefinition};

const BACKGROUND: [u8; 3] = [255, 255, 255];
const INK: [u8; 3] = [0, 0, 0];
const CAPTION: [u8; 3] = [128, 128, 128];
const REGION: [u8; 3] = [220, 40, 40];

/// Draw the placeholder for the `index`-th (1-based) of `total` states
pub fn render_placeholder(
    state: &StateDefinition,
    index: usize,
    total: usize,
    size: (u32, u32),
) -> Framebuffer {
    let (width, height) = size;
    let mut fb = Framebuffer::with_color(width, height, BACKGROUND);

    let big = index.to_string();
    let big_scale = (width.min(height) / 3 / GLYPH_SIZE).max(1);
    let small_scale = (big_scale / 5).max(1);
    let line = GLYPH_SIZE * small_scale;

    let center_y = height / 2;
    let big_height = GLYPH_SIZE * big_scale;
    let big_top = center_y.saturating_sub(big_height / 2);
    draw_centered(&mut fb, big_top, &big, big_scale, INK);

    let caption_top = big_top + big_height + line;
    draw_centered(
        &mut fb,
        caption_top,
        &format!("Step {} of {}", index, total),
        small_scale,
        CAPTION,
    );
    draw_centered(&mut fb, caption_top + 2 * line, &state.id, small_scale, CAPTION);

    let stroke = (small_scale / 2).max(2);
    for transition in &state.transitions {
        let r = transition.region;
        let (x, y) = (r.x1.max(0) as u32, r.y1.max(0) as u32);
        let (w, h) = (r.width().max(0) as u32 + 1, r.height().max(0) as u32 + 1);
        fb.stroke_rect(x, y, w, h, stroke, REGION);
        fb.draw_text(
            x + stroke + 2,
            y + stroke + 2,
            &format!("-> {}", transition.next_state),
            1,
            REGION,
        );
    }

    fb
}

fn draw_centered(fb: &mut Framebuffer, top: u32, text: &str, scale: u32, color: [u8; 3]) {
    let left = fb.width().saturating_sub(Framebuffer::text_width(text, scale)) / 2;
    fb.draw_text(left, top, text, scale, color);
}

/// Write a placeholder for every state whose screenshot is missing
/// (or every state, with `overwrite`). Returns the files written.
pub fn write_placeholders(
    scenario: &ScenarioDefinition,
    size: (u32, u32),
    overwrite: bool,
) -> HarnessResult<Vec<PathBuf>> {
    let total = scenario.states.len();
    let mut written = Vec::new();

    for (i, state) in scenario.states.iter().enumerate() {
        let path = &state.screenshot;
        if path.exists() && !overwrite {
            continue;
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| HarnessError::io(parent, e))?;
        }

        let image = render_placeholder(state, i + 1, total, size).to_image()?;
        image
            .save(path)
            .map_err(|e| HarnessError::Render(format!("{}: {}", path.display(), e)))?;

        info!(state = %state.id, path = %path.display(), "wrote placeholder");
        written.push(path.clone());
    }

    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::load_str;

    const SCENARIO: &str = r#"
test_name: placeholders
instruction: go
states:
  - id: home
    screenshot: shots/home.png
    transitions:
      - { click_region: [10, 10, 60, 40], next_state: done }
  - { id: done, screenshot: shots/done.jpg, is_terminal: true }
"#;

    #[test]
    fn test_region_outlined() {
        let scenario = load_str(SCENARIO, ".").unwrap();
        let fb = render_placeholder(&scenario.states[0], 1, 2, (200, 400));
        assert_eq!(fb.get_pixel(10, 10), REGION);
        assert_eq!(fb.get_pixel(60, 40), REGION);
        assert_eq!(fb.get_pixel(199, 399), BACKGROUND);
    }

    #[test]
    fn test_writes_missing_files_only() {
        let dir = tempfile::tempdir().unwrap();
        let scenario = load_str(SCENARIO, dir.path()).unwrap();

        let written = write_placeholders(&scenario, (120, 240), false).unwrap();
        assert_eq!(written.len(), 2);
        let img = image::open(dir.path().join("shots/home.png")).unwrap();
        assert_eq!((img.width(), img.height()), (120, 240));
        assert!(dir.path().join("shots/done.jpg").exists());

        assert!(write_placeholders(&scenario, (120, 240), false).unwrap().is_empty());
        assert_eq!(write_placeholders(&scenario, (120, 240), true).unwrap().len(), 2);
    }
}
