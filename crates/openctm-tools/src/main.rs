use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use openctm_core::{CompressionMethod, Context, ContextMode};

#[derive(Parser)]
#[command(name = "ctmtool")]
#[command(about = "Inspect and re-compress OpenCTM mesh files")]
struct Cli {
    /// Log codec details (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print header, counts and map names of a .ctm file
    Info {
        input: PathBuf,
    },
    /// Load a .ctm file and write it again with new settings
    Convert(ConvertArgs),
}

#[derive(Clone, Copy, ValueEnum)]
enum MethodArg {
    Mg1,
    Mg2,
}

impl From<MethodArg> for CompressionMethod {
    fn from(method: MethodArg) -> Self {
        match method {
            MethodArg::Mg1 => CompressionMethod::Mg1,
            MethodArg::Mg2 => CompressionMethod::Mg2,
        }
    }
}

#[derive(clap::Args)]
struct ConvertArgs {
    input: PathBuf,
    output: PathBuf,

    #[arg(long, value_enum, default_value = "mg1")]
    method: MethodArg,

    /// LZMA level, 0..=9
    #[arg(long, default_value_t = 1)]
    level: u32,

    /// Absolute vertex precision (MG2)
    #[arg(long, conflicts_with = "vertex_precision_rel")]
    vertex_precision: Option<f32>,

    /// Vertex precision relative to the average edge length (MG2)
    #[arg(long)]
    vertex_precision_rel: Option<f32>,

    #[arg(long)]
    normal_precision: Option<f32>,

    /// Precision for every UV map (MG2)
    #[arg(long)]
    uv_precision: Option<f32>,

    /// Precision for every attribute map (MG2)
    #[arg(long)]
    attrib_precision: Option<f32>,

    /// Replaces the file comment
    #[arg(long)]
    comment: Option<String>,

    /// Drop the normals
    #[arg(long)]
    no_normals: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Command::Info { input } => {
            print!("{}", describe(&input)?);
            Ok(())
        }
        Command::Convert(args) => convert(&args),
    }
}

fn load(path: &Path) -> Result<Context> {
    let mut ctx = Context::new(ContextMode::Import);
    ctx.load_file(path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok(ctx)
}

fn describe(path: &Path) -> Result<String> {
    let ctx = load(path)?;
    let mesh = ctx.mesh().ok_or_else(|| anyhow!("{} holds no mesh", path.display()))?;

    let mut out = String::new();
    out.push_str(&format!("File:        {}\n", path.display()));
    out.push_str(&format!("Method:      {}\n", ctx.compression_method().name()));
    if ctx.compression_method() == CompressionMethod::Mg2 {
        out.push_str(&format!("Precision:   vertex {}, normal {}\n", ctx.vertex_precision(), ctx.normal_precision()));
    }
    out.push_str(&format!("Comment:     {}\n", ctx.file_comment().unwrap_or("")));
    out.push_str(&format!("Vertices:    {}\n", mesh.vertex_count()));
    out.push_str(&format!("Triangles:   {}\n", mesh.triangle_count()));
    out.push_str(&format!("Normals:     {}\n", if mesh.has_normals() { "yes" } else { "no" }));
    for map in mesh.uv_maps() {
        out.push_str(&format!(
            "UV map:      {} (file {}, precision {})\n",
            map.name,
            map.file_name.as_deref().unwrap_or("-"),
            map.precision
        ));
    }
    for map in mesh.attrib_maps() {
        out.push_str(&format!("Attrib map:  {} (precision {})\n", map.name, map.precision));
    }
    Ok(out)
}

fn convert(args: &ConvertArgs) -> Result<()> {
    let source = load(&args.input)?;
    let mesh = source
        .mesh()
        .ok_or_else(|| anyhow!("{} holds no mesh", args.input.display()))?;

    let mut ctx = Context::new(ContextMode::Export);
    let normals = if args.no_normals { None } else { mesh.normals().map(<[_]>::to_vec) };
    ctx.define_mesh(mesh.vertices().to_vec(), mesh.indices().to_vec(), normals)?;
    ctx.set_compression_method(args.method.into())?;
    ctx.set_compression_level(args.level)?;

    if let Some(p) = args.vertex_precision {
        ctx.set_vertex_precision(p)?;
    } else if let Some(r) = args.vertex_precision_rel {
        ctx.set_vertex_precision_rel(r)?;
    } else if source.compression_method() == CompressionMethod::Mg2 {
        ctx.set_vertex_precision(source.vertex_precision())?;
    }
    ctx.set_normal_precision(args.normal_precision.unwrap_or(source.normal_precision()))?;

    for map in mesh.uv_maps() {
        let id = ctx.add_uv_map(map.coords.clone(), &map.name, map.file_name.as_deref())?;
        ctx.set_uv_coord_precision(id, args.uv_precision.unwrap_or(map.precision))?;
    }
    for map in mesh.attrib_maps() {
        let id = ctx.add_attrib_map(map.values.clone(), &map.name)?;
        ctx.set_attrib_precision(id, args.attrib_precision.unwrap_or(map.precision))?;
    }

    let comment = args.comment.as_deref().or(source.file_comment());
    ctx.set_file_comment(comment)?;

    ctx.save_file(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;

    info!(
        "{} -> {} ({}, {} vertices, {} triangles)",
        args.input.display(),
        args.output.display(),
        ctx.compression_method().name(),
        ctx.vertex_count(),
        ctx.triangle_count()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_convert() {
        let cli = Cli::try_parse_from([
            "ctmtool",
            "convert",
            "in.ctm",
            "out.ctm",
            "--method",
            "mg2",
            "--vertex-precision-rel",
            "0.01",
            "--no-normals",
        ])
        .unwrap();
        match cli.command {
            Command::Convert(args) => {
                assert!(matches!(args.method, MethodArg::Mg2));
                assert_eq!(args.vertex_precision_rel, Some(0.01));
                assert!(args.no_normals);
                assert_eq!(args.level, 1);
            }
            Command::Info { .. } => panic!("expected convert"),
        }
    }

    #[test]
    fn test_cli_rejects_both_vertex_precisions() {
        let result = Cli::try_parse_from([
            "ctmtool",
            "convert",
            "in.ctm",
            "out.ctm",
            "--vertex-precision",
            "0.1",
            "--vertex-precision-rel",
            "0.01",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_convert_and_describe() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.ctm");
        let output = dir.path().join("out.ctm");

        let mut ctx = Context::new(ContextMode::Export);
        ctx.define_mesh(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0, 1, 2]],
            Some(vec![[0.0, 0.0, 1.0]; 3]),
        )
        .unwrap();
        ctx.add_uv_map(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]], "uv", Some("tex.png")).unwrap();
        ctx.set_file_comment(Some("source")).unwrap();
        ctx.save_file(&input).unwrap();

        let args = ConvertArgs {
            input: input.clone(),
            output: output.clone(),
            method: MethodArg::Mg2,
            level: 5,
            vertex_precision: None,
            vertex_precision_rel: Some(0.001),
            normal_precision: None,
            uv_precision: None,
            attrib_precision: None,
            comment: None,
            no_normals: true,
        };
        convert(&args).unwrap();

        let text = describe(&output).unwrap();
        assert!(text.contains("Method:      MG2"));
        assert!(text.contains("Comment:     source"));
        assert!(text.contains("Normals:     no"));
        assert!(text.contains("UV map:      uv (file tex.png"));
    }
}
