use std::net::IpAddr;

use clap::{Args, Parser, Subcommand, ValueEnum};
use sentiment_storyteller::story::{
    GeneratorModel, Llama3_2Size, ModelSpec, ModernBertSize, Qwen3Size, DEFAULT_MAX_LENGTH,
    DEFAULT_TEMPERATURE,
};
use sentiment_storyteller::DeviceRequest;

#[derive(Parser, Debug)]
#[command(
    name = "storyteller",
    version,
    about = "Generate stories whose tone follows the sentiment of your prompt"
)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(flatten)]
    pub models: ModelArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the web form
    Serve(ServeArgs),
    /// Generate one story in the terminal
    Run(RunArgs),
}

#[derive(Args, Debug)]
pub struct ModelArgs {
    /// Sentiment classifier checkpoint
    #[arg(long, value_enum, default_value_t = SentimentModel::Base, global = true)]
    pub sentiment_model: SentimentModel,

    /// Story generator checkpoint
    #[arg(long, value_enum, default_value_t = Generator::Qwen3_0_6b, global = true)]
    pub generator: Generator,

    /// Run both models on this CUDA device instead of the CPU
    #[arg(long, value_name = "INDEX", global = true)]
    pub cuda: Option<usize>,

    /// Fixed sampling seed for reproducible stories
    #[arg(long, global = true)]
    pub seed: Option<u64>,
}

impl ModelArgs {
    pub fn spec(&self) -> ModelSpec {
        ModelSpec {
            sentiment: self.sentiment_model.into(),
            generator: self.generator.into(),
            device: self.cuda.map_or(DeviceRequest::Cpu, DeviceRequest::Cuda),
            seed: self.seed,
        }
    }
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    pub host: IpAddr,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8501)]
    pub port: u16,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Prompt to classify and continue
    #[arg(long)]
    pub prompt: String,

    /// Upper bound on instruction plus story tokens (50-200)
    #[arg(long, default_value_t = DEFAULT_MAX_LENGTH)]
    pub max_length: usize,

    /// Sampling temperature (0.1-1.0)
    #[arg(long, default_value_t = DEFAULT_TEMPERATURE)]
    pub temperature: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SentimentModel {
    Base,
    Large,
}

impl From<SentimentModel> for ModernBertSize {
    fn from(value: SentimentModel) -> Self {
        match value {
            SentimentModel::Base => ModernBertSize::Base,
            SentimentModel::Large => ModernBertSize::Large,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Generator {
    #[value(name = "qwen3-0.6b")]
    Qwen3_0_6b,
    #[value(name = "qwen3-1.7b")]
    Qwen3_1_7b,
    #[value(name = "qwen3-4b")]
    Qwen3_4b,
    #[value(name = "llama3.2-1b")]
    Llama3_2_1b,
    #[value(name = "llama3.2-3b")]
    Llama3_2_3b,
}

impl From<Generator> for GeneratorModel {
    fn from(value: Generator) -> Self {
        match value {
            Generator::Qwen3_0_6b => GeneratorModel::Qwen3(Qwen3Size::Size0_6B),
            Generator::Qwen3_1_7b => GeneratorModel::Qwen3(Qwen3Size::Size1_7B),
            Generator::Qwen3_4b => GeneratorModel::Qwen3(Qwen3Size::Size4B),
            Generator::Llama3_2_1b => GeneratorModel::Llama3_2(Llama3_2Size::Size1B),
            Generator::Llama3_2_3b => GeneratorModel::Llama3_2(Llama3_2Size::Size3B),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["storyteller", "serve"]).unwrap();
        let Commands::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        assert_eq!(args.port, 8501);
        assert_eq!(args.host.to_string(), "127.0.0.1");
        assert_eq!(cli.models.spec(), ModelSpec::default());
    }

    #[test]
    fn run_parses_model_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "storyteller",
            "-vv",
            "run",
            "--prompt",
            "a quiet harbor",
            "--temperature",
            "0.4",
            "--generator",
            "llama3.2-1b",
            "--cuda",
            "0",
            "--seed",
            "9",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        let spec = cli.models.spec();
        assert_eq!(spec.generator, GeneratorModel::Llama3_2(Llama3_2Size::Size1B));
        assert_eq!(spec.device, DeviceRequest::Cuda(0));
        assert_eq!(spec.seed, Some(9));

        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };
        assert_eq!(args.prompt, "a quiet harbor");
        assert_eq!(args.max_length, 100);
        assert_eq!(args.temperature, 0.4);
    }

    #[test]
    fn unknown_generator_is_rejected() {
        assert!(Cli::try_parse_from(["storyteller", "--generator", "gpt2", "serve"]).is_err());
    }
}
