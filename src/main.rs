use clap::Parser;
use gcsa_doubling::{
    alphabet::Alphabet,
    kmer::{read_text_kmers, unique_keys, KMer},
    read_buffer::{read_records, write_records},
    ConstructionError, ConstructionParameters, PathGraph, Result, LCP,
};
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;

/// gcsa-build: sort the k-mers of a sequence graph into path nodes by prefix doubling
#[derive(Parser, Debug)]
#[command(
    name = "gcsa-build",
    about = "Build the sorted path nodes of a GCSA from a k-mer file",
    version,
    arg_required_else_help = true
)]
struct Cli {
    /// K-mer file: tab-separated text records, or KMer records with --binary
    #[arg(value_name = "KMERS")]
    input: PathBuf,
    /// Output file for the sorted path node records
    #[arg(short, long, value_name = "FILE", default_value = "path_nodes.bin")]
    output: PathBuf,
    /// Read binary KMer records instead of text
    #[arg(long, default_value_t = false, requires = "kmer_length")]
    binary: bool,
    /// K-mer length of binary input
    #[arg(short = 'k', long, value_name = "K")]
    kmer_length: Option<usize>,
    /// Number of doubling rounds (1 to 3)
    #[arg(short = 'd', long, value_name = "STEPS", default_value_t = 3)]
    doubling_steps: usize,
    /// Worker threads (defaults to the number of CPUs)
    #[arg(short = 't', long, value_name = "N")]
    threads: Option<usize>,
    /// Path nodes per sorted run file
    #[arg(long, value_name = "NODES")]
    run_size: Option<usize>,
    /// Directory for temporary run files
    #[arg(long, value_name = "DIR")]
    temp_dir: Option<PathBuf>,
    /// Check the sorted path nodes before writing them
    #[arg(long, default_value_t = false)]
    verify: bool,
}

impl Cli {
    fn parameters(&self) -> ConstructionParameters {
        let mut params = ConstructionParameters::new()
            .with_doubling_steps(self.doubling_steps)
            .verify(self.verify);
        if let Some(threads) = self.threads {
            params = params.with_threads(threads);
        }
        if let Some(run_size) = self.run_size {
            params = params.with_run_size(run_size);
        }
        if let Some(dir) = &self.temp_dir {
            params = params.with_temp_dir(dir);
        }
        params
    }
}

fn load_kmers(cli: &Cli) -> Result<(Vec<KMer>, usize)> {
    if cli.binary {
        let kmer_length = cli.kmer_length.unwrap_or(0);
        if kmer_length == 0 || kmer_length > gcsa_doubling::Key::MAX_LENGTH {
            return Err(ConstructionError::Parse(format!(
                "k-mer length must be between 1 and {}",
                gcsa_doubling::Key::MAX_LENGTH
            )));
        }
        let kmers = read_records::<KMer, _>(&cli.input)?;
        info!("Read {} binary k-mers from {}", kmers.len(), cli.input.display());
        Ok((kmers, kmer_length))
    } else {
        read_text_kmers(&cli.input, &Alphabet::default())
    }
}

fn run(cli: &Cli) -> Result<()> {
    let params = cli.parameters();
    if let Err(e) = rayon::ThreadPoolBuilder::new()
        .num_threads(params.threads())
        .build_global()
    {
        warn!("Using the existing thread pool: {}", e);
    }

    let (mut kmers, kmer_length) = load_kmers(cli)?;
    let (keys, _last_char) = unique_keys(&mut kmers);
    let lcp = LCP::new(&keys, kmer_length);
    info!("{} unique {}-mers", keys.len(), kmer_length);

    let graph = PathGraph::build(&kmers, &lcp, &params)?;
    drop(kmers);

    let longest = graph
        .distinguishing_prefixes(&lcp)
        .into_iter()
        .map(|(ranks, chars)| ranks * kmer_length + chars)
        .max()
        .unwrap_or(0);
    info!(
        "{} path nodes after {} rounds; longest distinguishing prefix {} characters",
        graph.len(),
        graph.rounds(),
        longest
    );

    write_records(&cli.output, graph.nodes())?;
    info!("Wrote {}", cli.output.display());
    Ok(())
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
