use clap::{Arg, ArgMatches, Command};

use crate::consts::*;

pub fn create_varwin_cli() -> Command {
    Command::new(VARWIN_CMD)
        .bin_name(VARWIN_CMD)
        .version(VERSION)
        .about("Synthesize per-sample consensus windows from a reference FASTA and a multi-sample VCF")
        .arg(
            Arg::new("reference")
                .short('r')
                .long("reference")
                .value_name("FILE")
                .help("Reference FASTA file (plain or gzipped)")
                .required(true),
        )
        .arg(
            Arg::new("vcf")
                .long("vcf")
                .value_name("FILE")
                .help("Multi-sample VCF file (plain or gzipped)")
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .value_name("DIR")
                .help("Output directory; a fasta_samples_<timestamp> folder is created inside")
                .required(true),
        )
        .arg(
            Arg::new("length")
                .short('l')
                .long("length")
                .value_name("BP")
                .help("Consensus window length (default: 100)")
                .value_parser(clap::value_parser!(u64))
                .default_value("100"),
        )
        .arg(
            Arg::new("count")
                .short('c')
                .long("count")
                .value_name("NUMBER")
                .help("Total number of windows to sample across all chromosomes (default: 1000000)")
                .value_parser(clap::value_parser!(u64))
                .default_value("1000000"),
        )
        .arg(
            Arg::new("allele_frequency")
                .short('a')
                .long("allele-frequency")
                .alias("af")
                .value_name("FRACTION")
                .help("Inclusive minimum allele frequency for a record to be kept (default: 0.5)")
                .value_parser(clap::value_parser!(f64))
                .default_value("0.5"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_name("NUMBER")
                .help("Random seed for reproducible window sampling")
                .value_parser(clap::value_parser!(u64))
                .required(false),
        )
        .arg(
            Arg::new("threads")
                .short('t')
                .long("threads")
                .value_name("NUMBER")
                .help("Number of threads for parallel chromosome processing (default: 4)")
                .value_parser(clap::value_parser!(usize))
                .required(false),
        )
        .arg(
            Arg::new("scratch_dir")
                .long("scratch-dir")
                .value_name("DIR")
                .help("Persist intermediate JSON artifacts (chromosomes, samples, windows) to this directory")
                .required(false),
        )
}

pub mod handlers {
    use super::*;
    use crate::io::{FastaReader, SampleFastaWriter, ScratchWriter, VcfReader};
    use crate::models::VarwinConfig;
    use crate::reconstruct::SampleReconstructor;
    use crate::sampling::WindowSampler;
    use crate::variants::VariantDbBuilder;
    use anyhow::{Context, Result};
    use indicatif::{ProgressBar, ProgressStyle};
    use std::path::{Path, PathBuf};

    pub fn run_varwin(matches: &ArgMatches) -> Result<()> {
        let start_time = std::time::Instant::now();

        let reference_path = matches
            .get_one::<String>("reference")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow::anyhow!("Reference file is required"))?;
        let vcf_path = matches
            .get_one::<String>("vcf")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow::anyhow!("VCF file is required"))?;
        let output_path = matches
            .get_one::<String>("output")
            .map(PathBuf::from)
            .ok_or_else(|| anyhow::anyhow!("Output directory is required"))?;

        let config = VarwinConfig {
            window_length: matches
                .get_one::<u64>("length")
                .copied()
                .unwrap_or(DEFAULT_WINDOW_LENGTH),
            window_count: matches
                .get_one::<u64>("count")
                .copied()
                .unwrap_or(DEFAULT_WINDOW_COUNT),
            af_threshold: matches
                .get_one::<f64>("allele_frequency")
                .copied()
                .unwrap_or(DEFAULT_AF_THRESHOLD),
            seed: matches.get_one::<u64>("seed").copied(),
        };

        let thread_count = get_thread_count(matches.get_one::<usize>("threads").copied());
        rayon::ThreadPoolBuilder::new()
            .num_threads(thread_count)
            .build_global()
            .context("Failed to configure thread pool")?;

        let scratch = match matches.get_one::<String>("scratch_dir") {
            Some(dir) => Some(ScratchWriter::new(Path::new(dir))?),
            None => None,
        };

        println!("[1 / 4] VCF file: Start.");
        let vcf = VcfReader::open(&vcf_path)?;
        let samples = vcf.samples().to_vec();
        if samples.is_empty() {
            anyhow::bail!("VCF file has no sample columns: {:?}", vcf_path);
        }
        let mut builder = VariantDbBuilder::new(samples.clone(), config.af_threshold);
        for record in vcf {
            builder.push(&record?);
        }
        let variants = builder.finish();
        if let Some(writer) = &scratch {
            writer.write_json("chrs.json", &variants.chromosomes());
            writer.write_json("samples.json", &samples);
        }
        println!("[1 / 4] VCF file: Done.");

        println!("[2 / 4] Fasta file: Start.");
        let reference = FastaReader::read_reference(&reference_path)?;
        println!("[2 / 4] Fasta file: Done.");

        println!("[3 / 4] Consensus indexes: Start.");
        let sampler = WindowSampler::new(config.window_length, config.window_count, config.seed);
        let windows = sampler.sample(&variants, &reference)?;
        println!(
            "Sampled {} distinct windows across {} chromosomes",
            windows.total(),
            windows.chroms.len()
        );
        if let Some(writer) = &scratch {
            writer.write_json("consensuses.json", &windows);
        }
        println!("[3 / 4] Consensus indexes: Done.");

        println!("[4 / 4] Sample fasta files: Start.");
        let result_dir = output_path.join(format!(
            "fasta_samples_{}",
            chrono::Local::now().format("%Y-%m-%d_%H-%M-%S")
        ));
        std::fs::create_dir_all(&result_dir)
            .with_context(|| format!("Failed to create output folder: {:?}", result_dir))?;

        let reconstructor =
            SampleReconstructor::new(&reference, &variants, &windows, config.window_length);

        let progress = ProgressBar::new(samples.len() as u64);
        progress.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} samples")
                .unwrap(),
        );

        // Samples run strictly one after another; this bounds peak memory to
        // a single sample's reconstructed sequences.
        for sample in &samples {
            let per_chrom = reconstructor.reconstruct(sample);
            let fasta_path = result_dir.join(format!("{}.fasta", sample));
            let mut writer = SampleFastaWriter::create(&fasta_path, config.window_length)?;
            for (chrom, chrom_windows) in &per_chrom {
                writer.write_windows(chrom, chrom_windows)?;
            }
            writer.finish()?;
            progress.inc(1);
        }
        progress.finish_with_message("All samples written");
        println!("[4 / 4] Sample fasta files: Done.");

        println!(
            "Time (min): {:.2}",
            start_time.elapsed().as_secs_f64() / 60.0
        );
        Ok(())
    }
}
