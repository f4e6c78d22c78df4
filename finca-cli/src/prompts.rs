use anyhow::{bail, Result};
use chrono::NaiveDate;
use inquire::{Confirm, CustomType, Editor, Password, Select, Text};

use finca_core::{
    plots_for_farm, Crop, CropForm, Farm, Plot, Record, Role, RoleForm, User, Variety, AREA_UNITS,
    DEFAULT_PLOT_AREA_UNIT, FARM_AREA_UNITS, PREDEFINED_ROLES, RICE_TYPES,
};

use crate::cli::{CropArgs, FarmArgs, PlotArgs, RoleArgs, UserArgs, VarietyArgs};

/// How a form is being filled
///
/// Adding prompts for every field not given as a flag. Editing with flags
/// only changes the flagged fields; editing without flags prompts for
/// everything, pre-filled with the current values.
#[derive(Debug, Clone, Copy)]
pub struct FormMode {
    interactive: bool,
}

impl FormMode {
    pub fn add() -> Self {
        Self { interactive: true }
    }

    pub fn edit(any_flag: bool) -> Self {
        Self {
            interactive: !any_flag,
        }
    }
}

fn text_field(
    label: &str,
    flag: &Option<String>,
    current: &str,
    mode: FormMode,
) -> Result<String> {
    if let Some(value) = flag {
        return Ok(value.clone());
    }
    if !mode.interactive {
        return Ok(current.to_string());
    }
    Ok(Text::new(label).with_initial_value(current).prompt()?)
}

fn select_field(
    label: &str,
    options: Vec<String>,
    flag: &Option<String>,
    current: &str,
    mode: FormMode,
) -> Result<String> {
    if let Some(value) = flag {
        return Ok(value.clone());
    }
    if !mode.interactive {
        return Ok(current.to_string());
    }
    let cursor = options.iter().position(|o| o == current).unwrap_or(0);
    Ok(Select::new(label, options)
        .with_starting_cursor(cursor)
        .prompt()?)
}

fn catalog(options: &[&str]) -> Vec<String> {
    options.iter().map(|o| o.to_string()).collect()
}

fn names<R: Record>(records: &[R]) -> Vec<String> {
    records
        .iter()
        .map(|r| r.display_name().to_string())
        .collect()
}

pub fn farm_args_given(args: &FarmArgs) -> bool {
    args.name.is_some()
        || args.owner.is_some()
        || args.description.is_some()
        || args.area.is_some()
        || args.unit.is_some()
}

/// Fills a farm form on top of `current`
pub fn prompt_farm(args: &FarmArgs, current: &Farm, mode: FormMode) -> Result<Farm> {
    let name = text_field("Farm name:", &args.name, &current.name, mode)?;
    let owner = text_field("Owner:", &args.owner, &current.owner, mode)?;

    // Multiline input for the description
    let description = match &args.description {
        Some(d) => d.clone(),
        None if mode.interactive => Editor::new("Description:")
            .with_predefined_text(&current.description)
            .prompt()?
            .trim_end()
            .to_string(),
        None => current.description.clone(),
    };

    let area = text_field("Area:", &args.area, &current.area, mode)?;
    let area_unit = select_field(
        "Area unit:",
        catalog(&FARM_AREA_UNITS),
        &args.unit,
        &current.area_unit,
        mode,
    )?;

    Ok(Farm::new(name, owner, description, area, area_unit))
}

pub fn plot_args_given(args: &PlotArgs) -> bool {
    args.name.is_some()
        || args.area.is_some()
        || args.unit.is_some()
        || args.location.is_some()
        || args.farm.is_some()
}

/// Fills a plot form on top of `current`, offering the existing farms
pub fn prompt_plot(
    args: &PlotArgs,
    current: &Plot,
    farms: &[Farm],
    mode: FormMode,
) -> Result<Plot> {
    if mode.interactive && args.farm.is_none() && farms.is_empty() {
        bail!("No farms yet. Add one with `finca farm add` first.");
    }

    let name = text_field("Plot name:", &args.name, &current.name, mode)?;
    let area = text_field("Area:", &args.area, &current.area, mode)?;
    let unit = if current.area_unit.is_empty() {
        DEFAULT_PLOT_AREA_UNIT
    } else {
        current.area_unit.as_str()
    };
    let area_unit = select_field("Area unit:", catalog(&AREA_UNITS), &args.unit, unit, mode)?;
    let location = text_field("Location:", &args.location, &current.location, mode)?;
    let farm = select_field("Farm:", names(farms), &args.farm, &current.farm, mode)?;

    Ok(Plot::new(name, area, area_unit, location, farm))
}

pub fn crop_args_given(args: &CropArgs) -> bool {
    args.rice_type.is_some()
        || args.start_date.is_some()
        || args.area.is_some()
        || args.unit.is_some()
        || args.farm.is_some()
        || args.plot.is_some()
}

/// Fills a crop form on top of `form`.
///
/// The plot is picked from the plots of the chosen farm; picking a
/// different farm drops the previous plot.
pub fn prompt_crop(
    args: &CropArgs,
    mut form: CropForm,
    farms: &[Farm],
    plots: &[Plot],
    mode: FormMode,
) -> Result<Crop> {
    form.rice_type = select_field(
        "Rice type:",
        catalog(&RICE_TYPES),
        &args.rice_type,
        &form.rice_type,
        mode,
    )?;

    form.start_date = match args.start_date {
        Some(date) => date,
        None if mode.interactive => CustomType::<NaiveDate>::new("Start date (YYYY-MM-DD):")
            .with_default(form.start_date)
            .with_error_message("Please type a date as YYYY-MM-DD")
            .prompt()?,
        None => form.start_date,
    };

    form.area = text_field("Area:", &args.area, &form.area, mode)?;
    form.area_unit = select_field(
        "Area unit:",
        catalog(&AREA_UNITS),
        &args.unit,
        &form.area_unit,
        mode,
    )?;

    if mode.interactive && args.farm.is_none() && farms.is_empty() {
        bail!("No farms yet. Add one with `finca farm add` first.");
    }
    let farm = select_field("Farm:", names(farms), &args.farm, form.farm(), mode)?;
    if farm != form.farm() {
        form.select_farm(farm);
    }

    let offered = plots_for_farm(plots, form.farm());
    if mode.interactive && args.plot.is_none() && offered.is_empty() {
        bail!(
            "Farm '{}' has no plots. Add one with `finca plot add --farm \"{}\"` first.",
            form.farm(),
            form.farm()
        );
    }
    let plot = select_field("Plot:", names(&offered), &args.plot, form.plot(), mode)?;
    form.select_plot(plot);

    Ok(form.build())
}

pub fn variety_args_given(args: &VarietyArgs) -> bool {
    args.name.is_some() || args.description.is_some()
}

pub fn prompt_variety(args: &VarietyArgs, current: &Variety, mode: FormMode) -> Result<Variety> {
    let name = text_field("Variety name:", &args.name, &current.name, mode)?;
    let description = text_field("Description:", &args.description, &current.description, mode)?;
    Ok(Variety::new(name, description))
}

pub fn user_args_given(args: &UserArgs) -> bool {
    args.first_name.is_some()
        || args.last_name.is_some()
        || args.email.is_some()
        || args.role.is_some()
}

pub fn prompt_user(args: &UserArgs, current: &User, mode: FormMode) -> Result<User> {
    let first_name = text_field("First name:", &args.first_name, &current.first_name, mode)?;
    let last_name = text_field("Last name:", &args.last_name, &current.last_name, mode)?;
    let email = text_field("Email:", &args.email, &current.email, mode)?;
    let role = select_field(
        "Role:",
        catalog(&PREDEFINED_ROLES),
        &args.role,
        &current.role,
        mode,
    )?;
    Ok(User::new(first_name, last_name, email, role))
}

pub fn role_args_given(args: &RoleArgs) -> bool {
    args.base.is_some() || args.description.is_some()
}

/// Fills a role form; the stored name is derived from the base role
pub fn prompt_role(args: &RoleArgs, current: &Role, mode: FormMode) -> Result<RoleForm> {
    let start = RoleForm::from_role(current);
    let base_name = select_field(
        "Base role:",
        catalog(&PREDEFINED_ROLES),
        &args.base,
        &start.base_name,
        mode,
    )?;
    let description = text_field("Description:", &args.description, &start.description, mode)?;
    Ok(RoleForm::new(base_name, description))
}

/// Prompts for the login email, pre-filled with the remembered one
pub fn prompt_email(remembered: Option<&str>) -> Result<String> {
    Ok(Text::new("Email:")
        .with_initial_value(remembered.unwrap_or_default())
        .prompt()?)
}

pub fn prompt_password() -> Result<String> {
    Ok(Password::new("Password:").without_confirmation().prompt()?)
}

/// Asks before a delete unless `skip` is set
pub fn confirm_delete(what: &str, skip: bool) -> Result<bool> {
    if skip {
        return Ok(true);
    }
    Ok(Confirm::new(&format!("Are you sure you want to delete {}?", what))
        .with_default(false)
        .prompt()?)
}
