use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Shibboleth attribute filter policy runner
#[derive(Parser, Debug)]
#[command(
    name = "shibfilter",
    version,
    about = "Evaluate Shibboleth attribute filter policies against requests",
    long_about = "Loads an AttributeFilterPolicyGroup (attribute-filter.xml), validates it, \
                  and applies it to JSON request files describing a principal, the \
                  requesting service and the attributes resolved for it. Reports which \
                  attributes and values would be released and which would be withheld.",
    after_help = "\
EXAMPLES:
  shibfilter check attribute-filter.xml               Validate a policy file
  shibfilter run attribute-filter.xml request.json    Filter one request
  shibfilter run attribute-filter.xml requests/       Filter every *.json in a directory
  shibfilter -v run attribute-filter.xml req.json     Show policy verdicts and denied values
  shibfilter --json run attribute-filter.xml req.json Output results as JSON
  shibfilter run --watch attribute-filter.xml req/    Re-run whenever a file changes

EXIT CODES:
  0  Success
  1  One or more requests could not be filtered
  2  Tool failure (e.g., invalid policy or unreadable request)

LOGGING:
  Diagnostics go to stderr. Set RUST_LOG (e.g. RUST_LOG=shibfilter=trace)
  for more detail than --verbose gives."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Show policy verdicts, denied values and debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output results as JSON (for scripting and CI)
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Load and activate a policy file, then print its outline
    Check {
        /// attribute-filter.xml policy file
        #[arg(value_name = "POLICY")]
        policy: PathBuf,
    },

    /// Filter request files through a policy
    Run {
        /// attribute-filter.xml policy file
        #[arg(value_name = "POLICY")]
        policy: PathBuf,

        /// Request JSON files, or directories of them
        #[arg(value_name = "REQUEST", required = true)]
        requests: Vec<PathBuf>,

        /// Watch the policy and requests and re-run on change
        #[arg(long)]
        watch: bool,
    },
}
