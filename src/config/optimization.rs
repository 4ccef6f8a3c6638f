use serde::Serialize;

/// Names the minifier must never mangle.
pub const RESERVED_NAMES: [&str; 4] = [
    "minLength",
    "defaultMinLength",
    "maxLength",
    "defaultMaxLength",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Optimization {
    pub minimize: bool,
    pub minimizer: Vec<Minimizer>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Minimizer {
    pub terser_options: TerserOptions,
    pub extract_comments: ExtractComments,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerserOptions {
    pub compress: Compress,
    pub keep_classnames: bool,
    pub keep_fnames: bool,
    pub mangle: Mangle,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Compress {
    pub defaults: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Mangle {
    pub toplevel: bool,
    pub eval: bool,
    pub reserved: Vec<String>,
}

/// License and attribution comments are moved into this file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExtractComments {
    pub filename: String,
}

impl Default for Optimization {
    fn default() -> Self {
        Self {
            minimize: true,
            minimizer: vec![Minimizer {
                terser_options: TerserOptions {
                    compress: Compress { defaults: true },
                    keep_classnames: false,
                    keep_fnames: false,
                    mangle: Mangle {
                        toplevel: true,
                        eval: true,
                        reserved: RESERVED_NAMES.iter().map(|s| s.to_string()).collect(),
                    },
                },
                extract_comments: ExtractComments {
                    filename: "LICENSE.txt".to_string(),
                },
            }],
        }
    }
}
