use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;
use uuid::Uuid;

use crate::error::FincaError;

/// Area units offered by the farm form
pub const FARM_AREA_UNITS: [&str; 3] = ["m2", "hectáreas", "acres"];

/// Area units offered by the plot and crop forms
pub const AREA_UNITS: [&str; 3] = ["m2", "hectareas", "acres"];

/// Unit pre-selected on a fresh plot form
pub const DEFAULT_PLOT_AREA_UNIT: &str = "m2";

/// Rice types offered by the crop form
pub const RICE_TYPES: [&str; 3] = ["Arroz Tipo 1", "Arroz Tipo 2", "Arroz Tipo 3"];

/// Base role names offered by the user and role forms
pub const PREDEFINED_ROLES: [&str; 3] = ["Administrador", "Usuario", "Operario"];

/// The six named collections and the storage key each one lives under
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionKey {
    Farms,
    Plots,
    Crops,
    Varieties,
    Users,
    Roles,
}

impl CollectionKey {
    pub const ALL: [CollectionKey; 6] = [
        CollectionKey::Farms,
        CollectionKey::Plots,
        CollectionKey::Crops,
        CollectionKey::Varieties,
        CollectionKey::Users,
        CollectionKey::Roles,
    ];

    /// The key the serialized array is stored under
    pub fn storage_key(&self) -> &'static str {
        match self {
            CollectionKey::Farms => "fincas",
            CollectionKey::Plots => "lotes",
            CollectionKey::Crops => "cultivos",
            CollectionKey::Varieties => "variedades",
            CollectionKey::Users => "users",
            CollectionKey::Roles => "roles",
        }
    }
}

impl fmt::Display for CollectionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionKey::Farms => write!(f, "farms"),
            CollectionKey::Plots => write!(f, "plots"),
            CollectionKey::Crops => write!(f, "crops"),
            CollectionKey::Varieties => write!(f, "varieties"),
            CollectionKey::Users => write!(f, "users"),
            CollectionKey::Roles => write!(f, "roles"),
        }
    }
}

/// A record shape stored in one of the named collections.
///
/// Field names passed to [`Record::field`] are the serialized (stored) names,
/// e.g. `"fincaSeleccionada"` for a plot's farm.
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Which collection this record belongs to
    const COLLECTION: CollectionKey;

    /// Fields that must be non-empty before a create or update, in form order
    fn required_fields(&self) -> Vec<(&'static str, Cow<'_, str>)>;

    /// Looks up a field value by its stored name
    fn field(&self, name: &str) -> Option<Cow<'_, str>>;

    /// The name shown in lists and pickers
    fn display_name(&self) -> &str;

    /// Presence check over [`Record::required_fields`].
    /// Only emptiness is checked, never format.
    fn validate(&self) -> Result<(), FincaError> {
        match self
            .required_fields()
            .into_iter()
            .find(|(_, value)| value.is_empty())
        {
            Some((field, _)) => Err(FincaError::Validation {
                collection: Self::COLLECTION,
                field,
            }),
            None => Ok(()),
        }
    }
}

/// A farm ("finca")
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Farm {
    #[serde(rename = "fincaName")]
    pub name: String,

    pub owner: String,

    pub description: String,

    /// Numeric string as typed into the form
    pub area: String,

    #[serde(rename = "areaUnit")]
    pub area_unit: String,
}

impl Farm {
    pub fn new(
        name: impl Into<String>,
        owner: impl Into<String>,
        description: impl Into<String>,
        area: impl Into<String>,
        area_unit: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            owner: owner.into(),
            description: description.into(),
            area: area.into(),
            area_unit: area_unit.into(),
        }
    }
}

impl Record for Farm {
    const COLLECTION: CollectionKey = CollectionKey::Farms;

    fn required_fields(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        vec![
            ("fincaName", Cow::Borrowed(self.name.as_str())),
            ("owner", Cow::Borrowed(self.owner.as_str())),
            ("description", Cow::Borrowed(self.description.as_str())),
            ("area", Cow::Borrowed(self.area.as_str())),
            ("areaUnit", Cow::Borrowed(self.area_unit.as_str())),
        ]
    }

    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let value = match name {
            "fincaName" => &self.name,
            "owner" => &self.owner,
            "description" => &self.description,
            "area" => &self.area,
            "areaUnit" => &self.area_unit,
            _ => return None,
        };
        Some(Cow::Borrowed(value.as_str()))
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

/// A plot ("lote") inside a farm
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plot {
    #[serde(rename = "nombre")]
    pub name: String,

    pub area: String,

    #[serde(rename = "unidadMedida")]
    pub area_unit: String,

    #[serde(rename = "ubicacion")]
    pub location: String,

    /// Soft reference to [`Farm::name`]
    #[serde(rename = "fincaSeleccionada")]
    pub farm: String,
}

impl Default for Plot {
    fn default() -> Self {
        Self {
            name: String::new(),
            area: String::new(),
            area_unit: DEFAULT_PLOT_AREA_UNIT.to_string(),
            location: String::new(),
            farm: String::new(),
        }
    }
}

impl Plot {
    pub fn new(
        name: impl Into<String>,
        area: impl Into<String>,
        area_unit: impl Into<String>,
        location: impl Into<String>,
        farm: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            area: area.into(),
            area_unit: area_unit.into(),
            location: location.into(),
            farm: farm.into(),
        }
    }
}

impl Record for Plot {
    const COLLECTION: CollectionKey = CollectionKey::Plots;

    fn required_fields(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        vec![
            ("nombre", Cow::Borrowed(self.name.as_str())),
            ("area", Cow::Borrowed(self.area.as_str())),
            ("unidadMedida", Cow::Borrowed(self.area_unit.as_str())),
            ("ubicacion", Cow::Borrowed(self.location.as_str())),
            ("fincaSeleccionada", Cow::Borrowed(self.farm.as_str())),
        ]
    }

    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let value = match name {
            "nombre" => &self.name,
            "area" => &self.area,
            "unidadMedida" => &self.area_unit,
            "ubicacion" => &self.location,
            "fincaSeleccionada" => &self.farm,
            _ => return None,
        };
        Some(Cow::Borrowed(value.as_str()))
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

/// A crop ("cultivo") planted on a plot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crop {
    #[serde(rename = "tipoArroz")]
    pub rice_type: String,

    /// Stored as `YYYY-MM-DD`
    #[serde(rename = "fechaInicio")]
    pub start_date: NaiveDate,

    pub area: String,

    #[serde(rename = "unidadMedida")]
    pub area_unit: String,

    /// Soft reference to [`Farm::name`]
    #[serde(rename = "fincaSeleccionada")]
    pub farm: String,

    /// Soft reference to [`Plot::name`], scoped by `farm`
    #[serde(rename = "loteSeleccionado")]
    pub plot: String,
}

impl Record for Crop {
    const COLLECTION: CollectionKey = CollectionKey::Crops;

    fn required_fields(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        vec![
            ("tipoArroz", Cow::Borrowed(self.rice_type.as_str())),
            ("area", Cow::Borrowed(self.area.as_str())),
            ("unidadMedida", Cow::Borrowed(self.area_unit.as_str())),
            ("fincaSeleccionada", Cow::Borrowed(self.farm.as_str())),
            ("loteSeleccionado", Cow::Borrowed(self.plot.as_str())),
        ]
    }

    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let value = match name {
            "tipoArroz" => &self.rice_type,
            "fechaInicio" => {
                return Some(Cow::Owned(self.start_date.format("%Y-%m-%d").to_string()));
            }
            "area" => &self.area,
            "unidadMedida" => &self.area_unit,
            "fincaSeleccionada" => &self.farm,
            "loteSeleccionado" => &self.plot,
            _ => return None,
        };
        Some(Cow::Borrowed(value.as_str()))
    }

    fn display_name(&self) -> &str {
        &self.rice_type
    }
}

/// Form state for creating or editing a crop.
///
/// Picking a different farm clears the picked plot, since plots are
/// only offered for the selected farm.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CropForm {
    pub rice_type: String,
    pub start_date: NaiveDate,
    pub area: String,
    pub area_unit: String,
    farm: String,
    plot: String,
}

impl CropForm {
    /// A blank form starting today
    pub fn new() -> Self {
        Self::starting_on(chrono::Local::now().date_naive())
    }

    pub fn starting_on(start_date: NaiveDate) -> Self {
        Self {
            rice_type: String::new(),
            start_date,
            area: String::new(),
            area_unit: String::new(),
            farm: String::new(),
            plot: String::new(),
        }
    }

    /// Pre-fills the form from an existing crop
    pub fn from_crop(crop: &Crop) -> Self {
        Self {
            rice_type: crop.rice_type.clone(),
            start_date: crop.start_date,
            area: crop.area.clone(),
            area_unit: crop.area_unit.clone(),
            farm: crop.farm.clone(),
            plot: crop.plot.clone(),
        }
    }

    pub fn farm(&self) -> &str {
        &self.farm
    }

    pub fn plot(&self) -> &str {
        &self.plot
    }

    pub fn select_farm(&mut self, farm: impl Into<String>) {
        self.farm = farm.into();
        self.plot.clear();
    }

    pub fn select_plot(&mut self, plot: impl Into<String>) {
        self.plot = plot.into();
    }

    pub fn build(self) -> Crop {
        Crop {
            rice_type: self.rice_type,
            start_date: self.start_date,
            area: self.area,
            area_unit: self.area_unit,
            farm: self.farm,
            plot: self.plot,
        }
    }
}

impl Default for CropForm {
    fn default() -> Self {
        Self::new()
    }
}

/// A rice variety ("variedad")
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variety {
    #[serde(rename = "variedadName")]
    pub name: String,

    #[serde(rename = "descripcion")]
    pub description: String,
}

impl Variety {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
        }
    }
}

impl Record for Variety {
    const COLLECTION: CollectionKey = CollectionKey::Varieties;

    fn required_fields(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        vec![
            ("variedadName", Cow::Borrowed(self.name.as_str())),
            ("descripcion", Cow::Borrowed(self.description.as_str())),
        ]
    }

    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let value = match name {
            "variedadName" => &self.name,
            "descripcion" => &self.description,
            _ => return None,
        };
        Some(Cow::Borrowed(value.as_str()))
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}

/// A person working on the farms
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// First name; stored as `username` for compatibility
    #[serde(rename = "username")]
    pub first_name: String,

    #[serde(rename = "lastName")]
    pub last_name: String,

    pub email: String,

    /// Soft reference to a role name, never checked
    pub role: String,
}

impl User {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        role: impl Into<String>,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            role: role.into(),
        }
    }
}

impl Record for User {
    const COLLECTION: CollectionKey = CollectionKey::Users;

    fn required_fields(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        vec![
            ("username", Cow::Borrowed(self.first_name.as_str())),
            ("lastName", Cow::Borrowed(self.last_name.as_str())),
            ("email", Cow::Borrowed(self.email.as_str())),
            ("role", Cow::Borrowed(self.role.as_str())),
        ]
    }

    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let value = match name {
            "username" => &self.first_name,
            "lastName" => &self.last_name,
            "email" => &self.email,
            "role" => &self.role,
            _ => return None,
        };
        Some(Cow::Borrowed(value.as_str()))
    }

    fn display_name(&self) -> &str {
        &self.first_name
    }
}

/// A role such as "Operario 2"
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Base name plus a numeric suffix, see [`crate::roles::next_role_name`]
    #[serde(rename = "roleName")]
    pub name: String,

    pub description: String,

    /// Stable identifier; older stored roles have none
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
}

impl Role {
    /// The name without its numeric suffix (text before the first space)
    pub fn base_name(&self) -> &str {
        self.name.split(' ').next().unwrap_or_default()
    }
}

impl Record for Role {
    const COLLECTION: CollectionKey = CollectionKey::Roles;

    fn required_fields(&self) -> Vec<(&'static str, Cow<'_, str>)> {
        vec![
            ("roleName", Cow::Borrowed(self.name.as_str())),
            ("description", Cow::Borrowed(self.description.as_str())),
        ]
    }

    fn field(&self, name: &str) -> Option<Cow<'_, str>> {
        let value = match name {
            "roleName" => &self.name,
            "description" => &self.description,
            _ => return None,
        };
        Some(Cow::Borrowed(value.as_str()))
    }

    fn display_name(&self) -> &str {
        &self.name
    }
}
