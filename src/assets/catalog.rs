// src/assets/catalog.rs

//! The asset classes of a theme project.
//!
//! | class          | source (under src)                | destination      |
//! |----------------|-----------------------------------|------------------|
//! | vendor-scripts | `[vendor].files` or `vendor/**`   | `js/lib.js`      |
//! | vendor-styles  | `[vendor].files` or `vendor/**`   | `css/lib.css`    |
//! | styles         | `assets/css/**/*.{css,pcss}`      | `css/main.css`   |
//! | scripts        | `assets/js/**/*.js`               | `js/main.js`     |
//! | includes       | `includes/**/*.php`, `.env`       | `inc/`           |
//! | controllers    | `templates/controllers/**/*.php`  | root, flattened  |
//! | views          | `templates/**/*.twig`             | `views/`, flat   |
//! | images         | `assets/img/**/*`                 | `img/`           |
//! | fonts          | `assets/fonts/**/*`               | `fonts/`         |

use std::sync::Arc;

use crate::assets::{compile_globs, AssetClass};
use crate::config::{Settings, ToolsSection};
use crate::errors::Result;
use crate::transform::builtin::{CssLinter, CssMinifier, JsLinter, JsMinifier, StyleVariables};
use crate::transform::external::ExternalCommand;
use crate::transform::{Chain, Linter, MinifyStep, Stage, Transform};
use crate::types::{AssetClassKind, ReloadMode};

pub mod names {
    pub const VENDOR_SCRIPTS: &str = "vendor-scripts";
    pub const VENDOR_STYLES: &str = "vendor-styles";
    pub const STYLES: &str = "styles";
    pub const SCRIPTS: &str = "scripts";
    pub const INCLUDES: &str = "includes";
    pub const CONTROLLERS: &str = "controllers";
    pub const VIEWS: &str = "views";
    pub const IMAGES: &str = "images";
    pub const FONTS: &str = "fonts";
}

/// Stylesheets shared by every project; never linted.
const UNLINTED_STYLES: &[&str] = &["defaults.css", "helpers.css"];

/// Build every asset class for `settings`, vendor classes first.
pub fn default_classes(settings: &Settings) -> Result<Vec<AssetClass>> {
    let tools = &settings.tools;

    Ok(vec![
        vendor_class(settings, names::VENDOR_SCRIPTS, "js", "lib.js", script_minifier(tools))?,
        vendor_class(settings, names::VENDOR_STYLES, "css", "lib.css", style_minifier(tools))?
            .with_reload_matcher(&["**/*.css"])?
            .with_reload_mode(ReloadMode::Inject),
        styles(tools)?,
        scripts(tools)?,
        AssetClass::new(
            names::INCLUDES,
            AssetClassKind::Include,
            "includes",
            strings(&["**/*.php", ".env"]),
            "inc",
            Chain::default(),
        )?,
        AssetClass::new(
            names::CONTROLLERS,
            AssetClassKind::Controller,
            "templates/controllers",
            strings(&["**/*.php"]),
            "",
            Chain {
                stages: vec![Stage::Flatten],
                minify: None,
            },
        )?,
        AssetClass::new(
            names::VIEWS,
            AssetClassKind::View,
            "templates",
            strings(&["**/*.twig"]),
            "views",
            Chain {
                stages: vec![Stage::Flatten],
                minify: None,
            },
        )?,
        images(tools)?,
        AssetClass::new(
            names::FONTS,
            AssetClassKind::Font,
            "assets/fonts",
            strings(&["**/*"]),
            "fonts",
            Chain::default(),
        )?,
    ])
}

fn vendor_class(
    settings: &Settings,
    name: &str,
    ext: &str,
    target: &str,
    minifier: Arc<dyn Transform>,
) -> Result<AssetClass> {
    // Listed files keep their listed order; otherwise everything under vendor/.
    let (base, globs) = if settings.vendor_files.is_empty() {
        ("vendor", vec![format!("**/*.{ext}")])
    } else {
        let suffix = format!(".{ext}");
        let globs = settings
            .vendor_files
            .iter()
            .filter(|f| f.ends_with(&suffix))
            .map(|f| globset::escape(f))
            .collect();
        ("", globs)
    };

    AssetClass::new(
        name,
        AssetClassKind::Vendor,
        base,
        globs,
        ext,
        Chain {
            stages: vec![Stage::Concat(target.to_string())],
            minify: Some(MinifyStep {
                minifier,
                sourcemap: true,
            }),
        },
    )
}

fn styles(tools: &ToolsSection) -> Result<AssetClass> {
    let transform: Arc<dyn Transform> = match &tools.style_transform {
        Some(cmd) => Arc::new(ExternalCommand::new("style-transform", cmd)),
        None => Arc::new(StyleVariables),
    };
    let linter: Arc<dyn Linter> = match &tools.style_lint {
        Some(cmd) => Arc::new(ExternalCommand::new("style-lint", cmd)),
        None => Arc::new(CssLinter),
    };
    let skip = compile_globs(names::STYLES, &strings(UNLINTED_STYLES))?;

    AssetClass::new(
        names::STYLES,
        AssetClassKind::Style,
        "assets/css",
        strings(&["**/*.css", "**/*.pcss"]),
        "css",
        Chain {
            stages: vec![
                Stage::Transform(transform),
                Stage::Lint {
                    linter,
                    skip: Some(skip),
                },
                Stage::Concat("main.css".to_string()),
            ],
            minify: Some(MinifyStep {
                minifier: style_minifier(tools),
                sourcemap: true,
            }),
        },
    )?
    .with_reload_matcher(&["**/*.css"])
}

fn scripts(tools: &ToolsSection) -> Result<AssetClass> {
    let linter: Arc<dyn Linter> = match &tools.script_lint {
        Some(cmd) => Arc::new(ExternalCommand::new("script-lint", cmd)),
        None => Arc::new(JsLinter),
    };

    AssetClass::new(
        names::SCRIPTS,
        AssetClassKind::Script,
        "assets/js",
        strings(&["**/*.js"]),
        "js",
        Chain {
            stages: vec![
                Stage::Lint { linter, skip: None },
                Stage::Concat("main.js".to_string()),
            ],
            minify: Some(MinifyStep {
                minifier: script_minifier(tools),
                sourcemap: true,
            }),
        },
    )
}

fn images(tools: &ToolsSection) -> Result<AssetClass> {
    let stages = match &tools.image_optimize {
        Some(cmd) => vec![Stage::Transform(Arc::new(ExternalCommand::new("image-optimize", cmd)))],
        None => Vec::new(),
    };

    AssetClass::new(
        names::IMAGES,
        AssetClassKind::Image,
        "assets/img",
        strings(&["**/*"]),
        "img",
        Chain {
            stages,
            minify: None,
        },
    )
}

fn style_minifier(tools: &ToolsSection) -> Arc<dyn Transform> {
    match &tools.style_minify {
        Some(cmd) => Arc::new(ExternalCommand::new("style-minify", cmd)),
        None => Arc::new(CssMinifier),
    }
}

fn script_minifier(tools: &ToolsSection) -> Arc<dyn Transform> {
    match &tools.script_minify {
        Some(cmd) => Arc::new(ExternalCommand::new("script-minify", cmd)),
        None => Arc::new(JsMinifier),
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
