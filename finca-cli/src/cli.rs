use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[clap(author, version, about = "Keep track of farms, plots, crops and the people working them")]
pub struct Cli {
    /// Path to the config file (defaults to FINCA_CONFIG_PATH or the user config dir)
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to the data store (a directory, or a .db file for SQLite)
    #[clap(long, global = true)]
    pub data: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage farms
    #[clap(subcommand)]
    Farm(RecordCommand<FarmArgs>),

    /// Manage plots
    #[clap(subcommand)]
    Plot(PlotCommand),

    /// Manage crops
    #[clap(subcommand)]
    Crop(CropCommand),

    /// Manage rice varieties
    #[clap(subcommand)]
    Variety(RecordCommand<VarietyArgs>),

    /// Manage users
    #[clap(subcommand)]
    User(RecordCommand<UserArgs>),

    /// Manage roles
    #[clap(subcommand)]
    Role(RecordCommand<RoleArgs>),

    /// Log in against the API and store the token
    Login {
        /// Email to log in with (prompted, pre-filled with the remembered one, if omitted)
        #[clap(long)]
        email: Option<String>,

        /// Remember the email for the next login (the default when one is already remembered)
        #[clap(long)]
        remember: bool,

        /// Forget the remembered email
        #[clap(long, conflicts_with = "remember")]
        forget: bool,
    },

    /// Forget the stored token
    Logout,

    /// Request a password reset for a registered email
    Recover {
        /// The email of the user
        email: String,
    },

    /// Report plots and crops whose farm or plot no longer exists
    Check,

    /// Manage the configuration file
    #[clap(subcommand)]
    Config(ConfigCommand),
}

/// Commands shared by every collection
#[derive(Subcommand, Debug)]
pub enum RecordCommand<A: Args> {
    /// Add a record; missing fields are prompted for
    Add {
        #[clap(flatten)]
        fields: A,
    },

    /// List all records with their index
    List,

    /// Edit the record at an index; without field flags every field is prompted
    Edit {
        /// Index as shown by `list`
        index: usize,

        #[clap(flatten)]
        fields: A,
    },

    /// Delete the record at an index
    Del {
        /// Index as shown by `list`
        index: usize,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum PlotCommand {
    /// Add a plot; missing fields are prompted for
    Add {
        #[clap(flatten)]
        fields: PlotArgs,
    },

    /// List plots, optionally only those of one farm
    List {
        /// Only plots of this farm (exact name)
        #[clap(long)]
        farm: Option<String>,
    },

    /// Edit the plot at an index; without field flags every field is prompted
    Edit {
        /// Index as shown by `list`
        index: usize,

        #[clap(flatten)]
        fields: PlotArgs,
    },

    /// Delete the plot at an index
    Del {
        /// Index as shown by `list`
        index: usize,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum CropCommand {
    /// Add a crop; missing fields are prompted for
    Add {
        #[clap(flatten)]
        fields: CropArgs,
    },

    /// List crops, optionally only those of one farm or plot
    List {
        /// Only crops on this farm (exact name)
        #[clap(long)]
        farm: Option<String>,

        /// Only crops on this plot of the farm
        #[clap(long, requires = "farm")]
        plot: Option<String>,
    },

    /// Edit the crop at an index; without field flags every field is prompted
    Edit {
        /// Index as shown by `list`
        index: usize,

        #[clap(flatten)]
        fields: CropArgs,
    },

    /// Delete the crop at an index
    Del {
        /// Index as shown by `list`
        index: usize,

        /// Skip confirmation prompt
        #[clap(long, short = 'y')]
        yes: bool,
    },
}

#[derive(Args, Debug, Default)]
pub struct FarmArgs {
    /// Name of the farm
    #[clap(long)]
    pub name: Option<String>,

    /// Owner of the farm
    #[clap(long)]
    pub owner: Option<String>,

    /// Description of the farm
    #[clap(long)]
    pub description: Option<String>,

    /// Area, as a number
    #[clap(long)]
    pub area: Option<String>,

    /// Area unit (m2, hectáreas, acres)
    #[clap(long)]
    pub unit: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct PlotArgs {
    /// Name of the plot
    #[clap(long)]
    pub name: Option<String>,

    /// Area, as a number
    #[clap(long)]
    pub area: Option<String>,

    /// Area unit (m2, hectareas, acres)
    #[clap(long)]
    pub unit: Option<String>,

    /// Where the plot is
    #[clap(long)]
    pub location: Option<String>,

    /// Farm the plot belongs to
    #[clap(long)]
    pub farm: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct CropArgs {
    /// Rice type (Arroz Tipo 1, Arroz Tipo 2, Arroz Tipo 3)
    #[clap(long)]
    pub rice_type: Option<String>,

    /// Start date, YYYY-MM-DD
    #[clap(long)]
    pub start_date: Option<NaiveDate>,

    /// Area, as a number
    #[clap(long)]
    pub area: Option<String>,

    /// Area unit (m2, hectareas, acres)
    #[clap(long)]
    pub unit: Option<String>,

    /// Farm the crop is on
    #[clap(long)]
    pub farm: Option<String>,

    /// Plot of that farm the crop is on
    #[clap(long)]
    pub plot: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct VarietyArgs {
    /// Name of the variety
    #[clap(long)]
    pub name: Option<String>,

    /// Description of the variety
    #[clap(long)]
    pub description: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct UserArgs {
    /// First name
    #[clap(long)]
    pub first_name: Option<String>,

    /// Last name
    #[clap(long)]
    pub last_name: Option<String>,

    /// Email address
    #[clap(long)]
    pub email: Option<String>,

    /// Role (Administrador, Usuario, Operario)
    #[clap(long)]
    pub role: Option<String>,
}

#[derive(Args, Debug, Default)]
pub struct RoleArgs {
    /// Base role; the stored name gets a running number appended
    #[clap(long)]
    pub base: Option<String>,

    /// Description of the role
    #[clap(long)]
    pub description: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Write a default config file if none exists
    Init,

    /// Print the effective configuration
    Show,
}
