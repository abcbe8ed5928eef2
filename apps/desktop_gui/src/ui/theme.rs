//! Theme presets and style plumbing for the GreenVision shell.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThemePreset {
    ForestDark,
    ForestLight,
}

impl ThemePreset {
    pub fn label(self) -> &'static str {
        match self {
            ThemePreset::ForestDark => "Forest (Dark)",
            ThemePreset::ForestLight => "Forest (Light)",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThemeSettings {
    pub preset: ThemePreset,
    pub accent_color: egui::Color32,
    pub panel_rounding: u8,
}

impl ThemeSettings {
    pub fn forest_default() -> Self {
        Self {
            preset: ThemePreset::ForestDark,
            accent_color: egui::Color32::from_rgb(34, 197, 94),
            panel_rounding: 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PersistedThemePreset {
    ForestDark,
    ForestLight,
}

impl From<ThemePreset> for PersistedThemePreset {
    fn from(value: ThemePreset) -> Self {
        match value {
            ThemePreset::ForestDark => Self::ForestDark,
            ThemePreset::ForestLight => Self::ForestLight,
        }
    }
}

impl From<PersistedThemePreset> for ThemePreset {
    fn from(value: PersistedThemePreset) -> Self {
        match value {
            PersistedThemePreset::ForestDark => Self::ForestDark,
            PersistedThemePreset::ForestLight => Self::ForestLight,
        }
    }
}

/// Fixed colors the card layouts draw on top of the base visuals.
#[derive(Debug, Clone, Copy)]
pub struct ForestPalette {
    pub app_background: egui::Color32,
    pub card_background: egui::Color32,
    pub card_stroke: egui::Color32,
    pub header_text: egui::Color32,
    pub hint_text: egui::Color32,
    pub success_badge_fill: egui::Color32,
    pub success_badge_text: egui::Color32,
    pub cluster_marker: egui::Color32,
}

pub fn preset_palette(preset: ThemePreset) -> ForestPalette {
    match preset {
        ThemePreset::ForestDark => ForestPalette {
            app_background: egui::Color32::from_rgb(18, 24, 21),
            card_background: egui::Color32::from_rgb(26, 34, 30),
            card_stroke: egui::Color32::from_rgb(44, 58, 50),
            header_text: egui::Color32::from_rgb(134, 239, 172),
            hint_text: egui::Color32::from_rgb(148, 163, 158),
            success_badge_fill: egui::Color32::from_rgb(22, 56, 35),
            success_badge_text: egui::Color32::from_rgb(134, 239, 172),
            cluster_marker: egui::Color32::from_rgb(234, 179, 8),
        },
        ThemePreset::ForestLight => ForestPalette {
            app_background: egui::Color32::from_rgb(249, 250, 251),
            card_background: egui::Color32::WHITE,
            card_stroke: egui::Color32::from_rgb(229, 231, 235),
            header_text: egui::Color32::from_rgb(22, 163, 74),
            hint_text: egui::Color32::from_rgb(107, 114, 128),
            success_badge_fill: egui::Color32::from_rgb(220, 252, 231),
            success_badge_text: egui::Color32::from_rgb(22, 163, 74),
            cluster_marker: egui::Color32::from_rgb(234, 179, 8),
        },
    }
}

pub fn visuals_for_theme(theme: ThemeSettings) -> egui::Visuals {
    let palette = preset_palette(theme.preset);
    let mut visuals = match theme.preset {
        ThemePreset::ForestDark => {
            let mut v = egui::Visuals::dark();
            v.override_text_color = None;
            v.window_fill = palette.card_background;
            v.panel_fill = palette.app_background;
            v.extreme_bg_color = egui::Color32::from_rgb(12, 17, 14);
            v.faint_bg_color = egui::Color32::from_rgb(33, 43, 38);
            v
        }
        ThemePreset::ForestLight => {
            let mut v = egui::Visuals::light();
            v.override_text_color = Some(egui::Color32::from_rgb(31, 41, 55));
            v.window_fill = palette.card_background;
            v.panel_fill = palette.app_background;
            v.extreme_bg_color = egui::Color32::from_rgb(243, 244, 246);
            v.faint_bg_color = egui::Color32::from_rgb(240, 253, 244);
            v
        }
    };

    visuals.hyperlink_color = theme.accent_color;
    visuals.window_corner_radius = egui::CornerRadius::same(theme.panel_rounding);
    visuals.menu_corner_radius = egui::CornerRadius::same(theme.panel_rounding);
    visuals.selection.bg_fill = theme.accent_color;
    visuals.widgets.active.bg_fill = theme.accent_color;
    visuals.widgets.hovered.bg_fill = theme.accent_color.gamma_multiply(0.85);

    visuals
}

pub fn scaled_text_styles(text_scale: f32) -> BTreeMap<egui::TextStyle, egui::FontId> {
    let mut styles = egui::Style::default().text_styles;
    for font in styles.values_mut() {
        font.size *= text_scale;
    }
    styles
}
