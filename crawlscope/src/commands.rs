use crate::CLAP_STYLING;
use clap::{arg, command};
use crawlscope_client::model::CRAWL_SCOPES;
use std::path::PathBuf;
use url::Url;

const STATUSES: [&str; 4] = ["PENDING", "RUNNING", "COMPLETED", "FAILED"];

fn job_id_arg() -> clap::Arg {
    arg!(<ID>)
        .help("The crawl job id")
        .value_parser(clap::value_parser!(i64))
}

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("crawlscope")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("crawlscope")
        .about("Create, monitor and visualize web-crawl jobs")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress spinners and non-essential output").global(true))
        .arg(arg!(-v --"verbose" "Log debug output to stderr (or the log file in ui mode)").global(true))
        .arg(
            arg!(-c --"config" <PATH>)
                .required(false)
                .global(true)
                .help("Configuration file (default: ~/.config/crawlscope/config.toml)")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            arg!(--"base-url" <URL>)
                .required(false)
                .global(true)
                .help("Backend API address, overriding the configured one")
                .value_parser(clap::value_parser!(Url)),
        )
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            command!("jobs")
                .about("Create, start and inspect crawl jobs")
                .subcommand_required(true)
                .subcommand(
                    command!("list")
                        .about("List crawl jobs")
                        .arg(
                            arg!(-s --"status" <STATUS>)
                                .required(false)
                                .help("Only show jobs with this status")
                                .value_parser(STATUSES)
                                .ignore_case(true),
                        )
                        .arg(arg!(--"json" "Print the job cards as JSON")),
                )
                .subcommand(
                    command!("create")
                        .about("Create a new crawl job")
                        .arg(
                            arg!(-u --"url" <URL>)
                                .required(true)
                                .help("The start URL")
                                .value_parser(clap::value_parser!(Url)),
                        )
                        .arg(
                            arg!(-d --"depth" <N>)
                                .required(false)
                                .help("Maximum crawl depth")
                                .value_parser(clap::value_parser!(u32).range(1..=10))
                                .default_value("2"),
                        )
                        .arg(
                            arg!(-s --"scope" <SCOPE>)
                                .required(false)
                                .help("Crawl scope")
                                .value_parser(CRAWL_SCOPES.to_vec())
                                .ignore_case(true)
                                .default_value("DOMAIN"),
                        )
                        .arg(arg!(--"ignore-robots" "Do not respect robots.txt"))
                        .arg(arg!(--"start" "Start the job right after creating it")),
                )
                .subcommand(command!("start").about("Start a pending crawl job").arg(job_id_arg()))
                .subcommand(
                    command!("show")
                        .about("Show a job with its stats, categories and pages")
                        .arg(job_id_arg())
                        .arg(
                            arg!(--"category" <CATEGORY>)
                                .required(false)
                                .help("Only list pages of this category"),
                        )
                        .arg(arg!(--"json" "Print the detail view as JSON")),
                )
                .subcommand(
                    command!("classify")
                        .about("Ask the backend to classify the pages of a completed job")
                        .arg(job_id_arg()),
                ),
        )
        .subcommand(
            command!("graph")
                .about("Render a job's link graph")
                .subcommand_required(true)
                .subcommand(
                    command!("export")
                        .about("Lay out the graph and save it as an image")
                        .arg(job_id_arg())
                        .arg(
                            arg!(--"view" <VIEW>)
                                .required(false)
                                .help("Network or tree layout")
                                .value_parser(["network", "tree"])
                                .default_value("network"),
                        )
                        .arg(
                            arg!(-f --"format" <FORMAT>)
                                .required(false)
                                .help("Image format")
                                .value_parser(["svg", "png", "jpeg"])
                                .default_value("svg"),
                        )
                        .arg(
                            arg!(-o --"out" <DIR>)
                                .required(false)
                                .help("Output directory (default: the configured download_dir)")
                                .value_parser(clap::value_parser!(PathBuf)),
                        ),
                ),
        )
        .subcommand(
            command!("export")
                .about("Download a server-side export of a job")
                .arg(job_id_arg())
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(true)
                        .help("Export format")
                        .value_parser(["graphml", "xml", "sitemap"]),
                )
                .arg(
                    arg!(-o --"out" <PATH>)
                        .required(false)
                        .help("Output file (default: crawl-job-<ID>-<FORMAT>.<ext> in download_dir)")
                        .value_parser(clap::value_parser!(PathBuf)),
                ),
        )
        .subcommand(command!("ui").about("Open the interactive dashboard"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_tree_is_consistent() {
        command_argument_builder().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let matches = command_argument_builder()
            .try_get_matches_from(["crawlscope", "jobs", "list", "--base-url", "http://h:1/api", "-q"])
            .unwrap();
        assert!(matches.get_flag("quiet"));
        assert_eq!(
            matches.get_one::<Url>("base-url").map(Url::as_str),
            Some("http://h:1/api")
        );
    }

    #[test]
    fn test_depth_out_of_range_is_rejected() {
        let result = command_argument_builder().try_get_matches_from([
            "crawlscope",
            "jobs",
            "create",
            "--url",
            "https://example.com",
            "--depth",
            "11",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_status_is_case_insensitive() {
        let matches = command_argument_builder()
            .try_get_matches_from(["crawlscope", "jobs", "list", "--status", "completed"])
            .unwrap();
        let (_, jobs) = matches.subcommand().unwrap();
        let (_, list) = jobs.subcommand().unwrap();
        let status = list.get_one::<String>("status").unwrap();
        assert!(status.eq_ignore_ascii_case("COMPLETED"));
    }
}
