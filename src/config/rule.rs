use serde::Serialize;
use serde_json::{Value, json};

/// How a module matching `test` is transformed before bundling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleRule {
    /// Pattern matched against module paths.
    pub test: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclude: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enforce: Option<Enforce>,
    /// Loaders, applied by the engine from last to first.
    #[serde(rename = "use")]
    pub uses: Vec<LoaderUse>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Enforce {
    Pre,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoaderUse {
    pub loader: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    pub options: Value,
}

impl LoaderUse {
    pub fn bare(loader: &str) -> Self {
        Self {
            loader: loader.to_string(),
            options: Value::Null,
        }
    }

    pub fn with(loader: &str, options: Value) -> Self {
        Self {
            loader: loader.to_string(),
            options,
        }
    }
}

/// Loader inserted by the stylesheet extraction plugin.
pub const EXTRACT_CSS_LOADER: &str = "mini-css-extract-plugin/loader";

pub(crate) fn lint(config_file: &str) -> ModuleRule {
    ModuleRule {
        test: r"\.js$".into(),
        exclude: Some("node_modules".into()),
        enforce: Some(Enforce::Pre),
        uses: vec![LoaderUse::with(
            "eslint-loader",
            json!({ "configFile": config_file, "emitWarning": true }),
        )],
    }
}

pub(crate) fn scripts() -> ModuleRule {
    ModuleRule {
        test: r"\.m?js$".into(),
        exclude: Some("(node_modules|bower_components)".into()),
        enforce: None,
        uses: vec![LoaderUse::with(
            "babel-loader",
            json!({
                "presets": ["@babel/preset-env"],
                "plugins": ["@babel/plugin-transform-runtime"],
            }),
        )],
    }
}

pub(crate) fn styles(postcss_config: &str) -> ModuleRule {
    ModuleRule {
        test: r"\.(s*)css$".into(),
        exclude: None,
        enforce: None,
        uses: vec![
            LoaderUse::bare(EXTRACT_CSS_LOADER),
            LoaderUse::with("css-loader", json!({ "importLoaders": 1 })),
            LoaderUse::with(
                "postcss-loader",
                json!({ "config": { "path": postcss_config } }),
            ),
            LoaderUse::bare("sass-loader"),
        ],
    }
}

pub(crate) fn fonts() -> ModuleRule {
    ModuleRule {
        test: r"\.(woff(2)?|ttf|eot|svg)?$".into(),
        exclude: None,
        enforce: None,
        uses: vec![LoaderUse::with(
            "file-loader",
            json!({ "name": "[name].[ext]", "outputPath": "fonts/" }),
        )],
    }
}
