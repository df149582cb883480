use crate::error::{Error, Result};

const DEFAULT_HAYSTACK: &str = "output";
const DEFAULT_PICKER: &str = "pickRandomString";
const DEFAULT_EMITTER: &str = "newShot.push_back";
const DEFAULT_PLACEHOLDER: &str = "fondleTarget";
const DEFAULT_UPPER_TOKEN: &str = "UPPER";
const DEFAULT_LOWER_TOKEN: &str = "LOWER";

/// Identifiers the generator source uses for its control-flow idioms.
///
/// These drive guard parsing and emission recognition; everything else in
/// the source is opaque to the extractor.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub struct Dialect {
    /// Variable searched by `find(...)` in guard conditions
    pub haystack: String,

    /// Function that picks one element of a braced list
    pub picker: String,

    /// Call that emits a phrase literal (e.g. `newShot.push_back`)
    pub emitter: String,

    /// Placeholder whose values depend on body focus
    pub focus_placeholder: String,

    /// Enumerator naming upper-body focus in conditions
    pub upper_token: String,

    /// Enumerator naming lower-body focus in conditions
    pub lower_token: String,
}

impl Default for Dialect {
    fn default() -> Self {
        Self {
            haystack: DEFAULT_HAYSTACK.to_string(),
            picker: DEFAULT_PICKER.to_string(),
            emitter: DEFAULT_EMITTER.to_string(),
            focus_placeholder: DEFAULT_PLACEHOLDER.to_string(),
            upper_token: DEFAULT_UPPER_TOKEN.to_string(),
            lower_token: DEFAULT_LOWER_TOKEN.to_string(),
        }
    }
}

/// Where a pick-list vocabulary lives: `variable = picker({...});` inside `function`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PickListSource {
    /// Function containing the assignment
    pub function: String,
    /// Variable receiving the picked element
    pub variable: String,
}

impl PickListSource {
    /// Creates a pick-list location.
    #[must_use]
    pub fn new(function: impl Into<String>, variable: impl Into<String>) -> Self {
        Self {
            function: function.into(),
            variable: variable.into(),
        }
    }
}

/// Configuration for reading a generator source into a [`Lexicon`](crate::Lexicon).
///
/// Use [`ExtractConfig::builder()`] to override individual names.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct ExtractConfig {
    /// Declaration holding general colors
    pub color: String,

    /// Declaration holding mouth-covering colors
    pub mask_color: String,

    /// Declaration holding fabric materials
    pub material: String,

    /// Declaration holding mouth-covering materials
    pub mouth_mask_material: String,

    /// Pick list for hair colors
    pub hair_color: PickListSource,

    /// Pick list for hair styles
    pub hair_style: PickListSource,

    /// Function whose pick lists hold upper-body clothing
    pub upper_clothing: String,

    /// Function whose pick lists hold lower-body clothing
    pub lower_clothing: String,

    /// Function whose emitted literals are camera angles
    pub camera: String,

    /// Control-flow identifiers
    pub dialect: Dialect,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            color: "color".to_string(),
            mask_color: "maskcolor".to_string(),
            material: "material".to_string(),
            mouth_mask_material: "mouthMaskMaterial".to_string(),
            hair_color: PickListSource::new("getHair", "haircolor"),
            hair_style: PickListSource::new("getHair", "hairstyle"),
            upper_clothing: "pickUpper".to_string(),
            lower_clothing: "pickLower".to_string(),
            camera: "getShot".to_string(),
            dialect: Dialect::default(),
        }
    }
}

impl ExtractConfig {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```
    /// use guardmix::ExtractConfig;
    ///
    /// let config = ExtractConfig::builder()
    ///     .camera("getAngle")
    ///     .emitter("angles.push_back")
    ///     .build()
    ///     .expect("valid configuration");
    /// assert_eq!(config.camera, "getAngle");
    /// ```
    #[must_use]
    pub fn builder() -> ExtractConfigBuilder {
        ExtractConfigBuilder::default()
    }

    /// Validates that every configured name can appear in C-family source.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first field that is not a plain
    /// identifier (or, for the emitter, a member-access path).
    pub fn validate(&self) -> Result<()> {
        let identifiers = [
            ("color", &self.color),
            ("mask_color", &self.mask_color),
            ("material", &self.material),
            ("mouth_mask_material", &self.mouth_mask_material),
            ("hair_color.function", &self.hair_color.function),
            ("hair_color.variable", &self.hair_color.variable),
            ("hair_style.function", &self.hair_style.function),
            ("hair_style.variable", &self.hair_style.variable),
            ("upper_clothing", &self.upper_clothing),
            ("lower_clothing", &self.lower_clothing),
            ("camera", &self.camera),
            ("haystack", &self.dialect.haystack),
            ("picker", &self.dialect.picker),
            ("focus_placeholder", &self.dialect.focus_placeholder),
            ("upper_token", &self.dialect.upper_token),
            ("lower_token", &self.dialect.lower_token),
        ];

        for (field, value) in identifiers {
            if !is_identifier(value) {
                return Err(Error::config(format!(
                    "{field} must be a plain identifier, got '{value}'"
                )));
            }
        }

        if !is_member_path(&self.dialect.emitter) {
            return Err(Error::config(format!(
                "emitter must be an identifier path like 'shots.push_back', got '{}'",
                self.dialect.emitter
            )));
        }

        if self.dialect.upper_token == self.dialect.lower_token {
            return Err(Error::config(format!(
                "upper_token and lower_token must differ (both '{}')",
                self.dialect.upper_token
            )));
        }

        Ok(())
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_member_path(s: &str) -> bool {
    let normalized = s.replace("::", ".").replace("->", ".");
    !normalized.is_empty() && normalized.split('.').all(is_identifier)
}

/// Builder for creating an [`ExtractConfig`].
#[derive(Debug, Default)]
pub struct ExtractConfigBuilder {
    color: Option<String>,
    mask_color: Option<String>,
    material: Option<String>,
    mouth_mask_material: Option<String>,
    hair_color: Option<PickListSource>,
    hair_style: Option<PickListSource>,
    upper_clothing: Option<String>,
    lower_clothing: Option<String>,
    camera: Option<String>,
    haystack: Option<String>,
    picker: Option<String>,
    emitter: Option<String>,
    focus_placeholder: Option<String>,
    upper_token: Option<String>,
    lower_token: Option<String>,
}

impl ExtractConfigBuilder {
    /// Sets the color declaration name.
    #[must_use]
    pub fn color(mut self, name: impl Into<String>) -> Self {
        self.color = Some(name.into());
        self
    }

    /// Sets the mask color declaration name.
    #[must_use]
    pub fn mask_color(mut self, name: impl Into<String>) -> Self {
        self.mask_color = Some(name.into());
        self
    }

    /// Sets the material declaration name.
    #[must_use]
    pub fn material(mut self, name: impl Into<String>) -> Self {
        self.material = Some(name.into());
        self
    }

    /// Sets the mouth-mask material declaration name.
    #[must_use]
    pub fn mouth_mask_material(mut self, name: impl Into<String>) -> Self {
        self.mouth_mask_material = Some(name.into());
        self
    }

    /// Sets where the hair color pick list lives.
    #[must_use]
    pub fn hair_color(mut self, function: impl Into<String>, variable: impl Into<String>) -> Self {
        self.hair_color = Some(PickListSource::new(function, variable));
        self
    }

    /// Sets where the hair style pick list lives.
    #[must_use]
    pub fn hair_style(mut self, function: impl Into<String>, variable: impl Into<String>) -> Self {
        self.hair_style = Some(PickListSource::new(function, variable));
        self
    }

    /// Sets the function holding upper clothing pick lists.
    #[must_use]
    pub fn upper_clothing(mut self, function: impl Into<String>) -> Self {
        self.upper_clothing = Some(function.into());
        self
    }

    /// Sets the function holding lower clothing pick lists.
    #[must_use]
    pub fn lower_clothing(mut self, function: impl Into<String>) -> Self {
        self.lower_clothing = Some(function.into());
        self
    }

    /// Sets the function whose emitted literals are camera angles.
    #[must_use]
    pub fn camera(mut self, function: impl Into<String>) -> Self {
        self.camera = Some(function.into());
        self
    }

    /// Sets the variable searched in guard conditions.
    #[must_use]
    pub fn haystack(mut self, name: impl Into<String>) -> Self {
        self.haystack = Some(name.into());
        self
    }

    /// Sets the pick-one-of-N function name.
    #[must_use]
    pub fn picker(mut self, name: impl Into<String>) -> Self {
        self.picker = Some(name.into());
        self
    }

    /// Sets the emitter call.
    #[must_use]
    pub fn emitter(mut self, call: impl Into<String>) -> Self {
        self.emitter = Some(call.into());
        self
    }

    /// Sets the focus-dependent placeholder variable.
    #[must_use]
    pub fn focus_placeholder(mut self, name: impl Into<String>) -> Self {
        self.focus_placeholder = Some(name.into());
        self
    }

    /// Sets the enumerators naming upper and lower body focus.
    #[must_use]
    pub fn focus_tokens(mut self, upper: impl Into<String>, lower: impl Into<String>) -> Self {
        self.upper_token = Some(upper.into());
        self.lower_token = Some(lower.into());
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<ExtractConfig> {
        let defaults = ExtractConfig::default();
        let dialect = Dialect {
            haystack: self.haystack.unwrap_or(defaults.dialect.haystack),
            picker: self.picker.unwrap_or(defaults.dialect.picker),
            emitter: self.emitter.unwrap_or(defaults.dialect.emitter),
            focus_placeholder: self
                .focus_placeholder
                .unwrap_or(defaults.dialect.focus_placeholder),
            upper_token: self.upper_token.unwrap_or(defaults.dialect.upper_token),
            lower_token: self.lower_token.unwrap_or(defaults.dialect.lower_token),
        };

        let config = ExtractConfig {
            color: self.color.unwrap_or(defaults.color),
            mask_color: self.mask_color.unwrap_or(defaults.mask_color),
            material: self.material.unwrap_or(defaults.material),
            mouth_mask_material: self
                .mouth_mask_material
                .unwrap_or(defaults.mouth_mask_material),
            hair_color: self.hair_color.unwrap_or(defaults.hair_color),
            hair_style: self.hair_style.unwrap_or(defaults.hair_style),
            upper_clothing: self.upper_clothing.unwrap_or(defaults.upper_clothing),
            lower_clothing: self.lower_clothing.unwrap_or(defaults.lower_clothing),
            camera: self.camera.unwrap_or(defaults.camera),
            dialect,
        };

        config.validate()?;
        Ok(config)
    }
}
