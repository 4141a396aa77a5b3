//! Theme selection and option validation.

use std::collections::BTreeMap;

use crate::RenderError;

/// Stylesheet of the default theme.
pub const STYLESHEET: &str = include_str!("../assets/tome.css");

/// Output path of the stylesheet, relative to the output root.
pub const STYLESHEET_PATH: &str = "_static/tome.css";

const THEMES: &[&str] = &["default"];
const OPTIONS: &[&str] = &["footer", "project_name", "show_breadcrumbs", "show_page_toc"];

/// Theme name and raw options, as configured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThemeSettings {
    pub name: String,
    pub options: BTreeMap<String, String>,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            name: "default".to_owned(),
            options: BTreeMap::new(),
        }
    }
}

/// Validated theme options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Theme {
    pub(crate) project_name: String,
    pub(crate) footer: Option<String>,
    pub(crate) show_breadcrumbs: bool,
    pub(crate) show_page_toc: bool,
}

impl Theme {
    pub(crate) fn from_settings(settings: &ThemeSettings) -> Result<Self, RenderError> {
        if !THEMES.contains(&settings.name.as_str()) {
            return Err(RenderError::UnknownTheme(settings.name.clone()));
        }
        if let Some(option) = settings.options.keys().find(|k| !OPTIONS.contains(&k.as_str())) {
            return Err(RenderError::UnknownOption {
                theme: settings.name.clone(),
                option: option.clone(),
            });
        }

        let flag = |name: &str| -> Result<bool, RenderError> {
            match settings.options.get(name).map(String::as_str) {
                None | Some("true") => Ok(true),
                Some("false") => Ok(false),
                Some(other) => Err(RenderError::InvalidOption {
                    option: name.to_owned(),
                    value: other.to_owned(),
                }),
            }
        };

        Ok(Self {
            project_name: settings
                .options
                .get("project_name")
                .cloned()
                .unwrap_or_else(|| "Documentation".to_owned()),
            footer: settings.options.get("footer").filter(|f| !f.is_empty()).cloned(),
            show_breadcrumbs: flag("show_breadcrumbs")?,
            show_page_toc: flag("show_page_toc")?,
        })
    }

    /// Stable description of everything that changes the output of a page.
    pub(crate) fn fingerprint(&self) -> String {
        format!(
            "default\nproject_name={}\nfooter={}\nshow_breadcrumbs={}\nshow_page_toc={}\n{STYLESHEET_PATH}",
            self.project_name,
            self.footer.as_deref().unwrap_or(""),
            self.show_breadcrumbs,
            self.show_page_toc,
        )
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn settings(name: &str, options: &[(&str, &str)]) -> ThemeSettings {
        ThemeSettings {
            name: name.to_owned(),
            options: options
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        }
    }

    #[test]
    fn test_defaults() {
        let theme = Theme::from_settings(&ThemeSettings::default()).unwrap();

        assert_eq!(theme.project_name, "Documentation");
        assert_eq!(theme.footer, None);
        assert!(theme.show_breadcrumbs);
        assert!(theme.show_page_toc);
    }

    #[test]
    fn test_options_are_applied() {
        let theme = Theme::from_settings(&settings(
            "default",
            &[
                ("project_name", "Java Notes"),
                ("footer", "(c) Team"),
                ("show_page_toc", "false"),
            ],
        ))
        .unwrap();

        assert_eq!(theme.project_name, "Java Notes");
        assert_eq!(theme.footer.as_deref(), Some("(c) Team"));
        assert!(theme.show_breadcrumbs);
        assert!(!theme.show_page_toc);
    }

    #[test]
    fn test_unknown_theme() {
        let err = Theme::from_settings(&settings("alabaster", &[])).unwrap_err();
        assert!(matches!(err, RenderError::UnknownTheme(name) if name == "alabaster"));
    }

    #[test]
    fn test_unknown_option() {
        let err = Theme::from_settings(&settings("default", &[("sidebar_width", "300")])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unknown option \"sidebar_width\" for theme \"default\""
        );
    }

    #[test]
    fn test_invalid_flag() {
        let err = Theme::from_settings(&settings("default", &[("show_breadcrumbs", "yes")])).unwrap_err();
        assert!(matches!(err, RenderError::InvalidOption { option, .. } if option == "show_breadcrumbs"));
    }

    #[test]
    fn test_fingerprint_tracks_options() {
        let a = Theme::from_settings(&ThemeSettings::default()).unwrap();
        let b = Theme::from_settings(&settings("default", &[("footer", "x")])).unwrap();

        assert_ne!(a.fingerprint(), b.fingerprint());
        assert_eq!(a.fingerprint(), a.clone().fingerprint());
    }
}
