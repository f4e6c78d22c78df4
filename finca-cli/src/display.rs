use colored::Colorize;

use finca_core::{Crop, Farm, Plot, Record, Role, User, Variety};

/// Table layout for listing a collection
pub trait Listing: Record {
    const HEADERS: &'static [&'static str];

    fn cells(&self) -> Vec<String>;
}

impl Listing for Farm {
    const HEADERS: &'static [&'static str] = &["Name", "Owner", "Area", "Description"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.owner.clone(),
            format!("{} {}", self.area, self.area_unit),
            first_line(&self.description),
        ]
    }
}

impl Listing for Plot {
    const HEADERS: &'static [&'static str] = &["Name", "Farm", "Area", "Location"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.farm.clone(),
            format!("{} {}", self.area, self.area_unit),
            self.location.clone(),
        ]
    }
}

impl Listing for Crop {
    const HEADERS: &'static [&'static str] = &["Rice type", "Start", "Farm", "Plot", "Area"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.rice_type.clone(),
            self.start_date.format("%Y-%m-%d").to_string(),
            self.farm.clone(),
            self.plot.clone(),
            format!("{} {}", self.area, self.area_unit),
        ]
    }
}

impl Listing for Variety {
    const HEADERS: &'static [&'static str] = &["Name", "Description"];

    fn cells(&self) -> Vec<String> {
        vec![self.name.clone(), first_line(&self.description)]
    }
}

impl Listing for User {
    const HEADERS: &'static [&'static str] = &["First name", "Last name", "Email", "Role"];

    fn cells(&self) -> Vec<String> {
        vec![
            self.first_name.clone(),
            self.last_name.clone(),
            self.email.clone(),
            self.role.clone(),
        ]
    }
}

impl Listing for Role {
    const HEADERS: &'static [&'static str] = &["Name", "Description"];

    fn cells(&self) -> Vec<String> {
        vec![self.name.clone(), first_line(&self.description)]
    }
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or_default().to_string()
}

/// Prints `(index, record)` pairs as an aligned table
pub fn print_table<'a, R, I>(rows: I)
where
    R: Listing + 'a,
    I: IntoIterator<Item = (usize, &'a R)>,
{
    let rows: Vec<(usize, Vec<String>)> = rows.into_iter().map(|(i, r)| (i, r.cells())).collect();

    if rows.is_empty() {
        println!("{}", format!("No {} found.", R::COLLECTION).yellow());
        return;
    }

    let mut widths: Vec<usize> = R::HEADERS.iter().map(|h| h.chars().count()).collect();
    for (_, cells) in &rows {
        for (width, cell) in widths.iter_mut().zip(cells) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header: Vec<String> = R::HEADERS
        .iter()
        .zip(&widths)
        .map(|(h, w)| format!("{:<w$}", h, w = *w))
        .collect();
    println!("{:<5} | {}", "#", header.join(" | "));
    let total = widths.iter().sum::<usize>() + widths.len() * 3 + 5;
    println!("{}", "-".repeat(total));

    for (index, cells) in rows {
        let line: Vec<String> = cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<w$}", c, w = *w))
            .collect();
        println!("{:<5} | {}", index, line.join(" | "));
    }
}
