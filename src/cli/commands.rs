use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "vp", about = concat!("vaultprops v", env!("CARGO_PKG_VERSION"), " - typed properties for markdown vaults"), version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Run against a different vault directory
    #[arg(short = 'C', long = "vault-dir", global = true)]
    pub vault_dir: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Decode a hierarchy-coded filename
    Describe(DescribeArgs),
    /// Reconcile and render a note's properties
    Paint(NoteArgs),
    /// Add missing template properties to a note
    Apply(NoteArgs),
    /// Rewrite every coded note into its template shape
    Normalize(NormalizeArgs),
    /// Step a version property
    Bump(BumpArgs),
    /// Set a status property
    Status(StatusArgs),
    /// Add, remove or recolor tags
    Tag(TagCmd),
    /// Inspect or edit the property map
    Map(MapCmd),
    /// Keep a note painted while files change on disk
    Watch(NoteArgs),
}

// ---------------------------------------------------------------------------
// Read commands
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct DescribeArgs {
    /// Filename or basename, e.g. 11_Hit_Boxes.md
    pub filename: String,
}

#[derive(Args)]
pub struct NoteArgs {
    /// Vault-relative note path
    pub note: String,
}

// ---------------------------------------------------------------------------
// Write commands
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct NormalizeArgs {
    /// Write changes (default is a dry run)
    #[arg(long)]
    pub yes: bool,
}

#[derive(Args)]
pub struct BumpArgs {
    /// Vault-relative note path
    pub note: String,
    /// Property key
    pub key: String,
    /// major, minor or patch
    pub segment: String,
    /// up or down
    #[arg(default_value = "up")]
    pub direction: String,
}

#[derive(Args)]
pub struct StatusArgs {
    /// Vault-relative note path
    pub note: String,
    /// Property key
    pub key: String,
    /// Glyph or state word (complete, draft, incomplete, testing, deprecated)
    pub state: String,
}

#[derive(Args)]
pub struct TagCmd {
    #[command(subcommand)]
    pub action: TagAction,
}

#[derive(Subcommand)]
pub enum TagAction {
    /// Add a tag to a note's tags property
    Add(TagEditArgs),
    /// Remove a tag from a note's tags property
    Remove(TagEditArgs),
    /// Set a tag's chip color for the whole vault
    Color(TagColorArgs),
}

#[derive(Args)]
pub struct TagEditArgs {
    /// Vault-relative note path
    pub note: String,
    /// Property key
    pub key: String,
    pub tag: String,
}

#[derive(Args)]
pub struct TagColorArgs {
    pub tag: String,
    /// Hex color, e.g. #e74c3c
    pub color: String,
}

// ---------------------------------------------------------------------------
// Map
// ---------------------------------------------------------------------------

#[derive(Args)]
pub struct MapCmd {
    #[command(subcommand)]
    pub action: Option<MapAction>,
}

#[derive(Subcommand)]
pub enum MapAction {
    /// List every mapped key (default)
    List,
    /// Map a key to a semantic type
    Set(MapSetArgs),
    /// Forget a key's mapping
    Remove(MapRemoveArgs),
}

#[derive(Args)]
pub struct MapSetArgs {
    pub key: String,
    /// id, type, category, parent, child, tags, author, version, "last update", status
    #[arg(value_name = "TYPE")]
    pub ty: String,
}

#[derive(Args)]
pub struct MapRemoveArgs {
    pub key: String,
}
