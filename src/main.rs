use clap::{arg,crate_version,Command};
use propack::{rnc,Method,Options,STD_OPTIONS};
type STDRESULT = Result<(),Box<dyn std::error::Error>>;

const RCH: &str = "unreachable was reached";

fn ok_to_overwrite(path_out: &str) -> bool {
    if let Ok(_f) = std::fs::File::open(path_out) {
        let mut ans = String::new();
        eprint!("{} exists, overwrite? (y/n) ",path_out);
        std::io::stdin().read_line(&mut ans).expect("could not read stdin");
        if ans.trim_end()=="y" || ans.trim_end()=="Y" {
            return true;
        }
        return false;
    }
    true
}

/// key is 4 hex digits, e.g. `1A2B`
fn parse_key(s: &str) -> Result<u16,String> {
    match hex::decode(s) {
        Ok(v) if v.len()==2 => Ok(u16::from_be_bytes([v[0],v[1]])),
        _ => Err(format!("key should be 4 hex digits, got `{}`",s))
    }
}

fn main() -> STDRESULT
{
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let long_help =
"Examples:
---------
Pack:          `propack pack -m 1 -i my_data -o my_data.rnc`
Unpack:        `propack unpack -i my_data.rnc -o my_data`
Encrypted:     `propack pack -m 2 -k 1A2B -i my_data -o my_data.rnc`
Carve:         `propack search -i disk_image -o extracted`";

    let mut main_cmd = Command::new("propack")
        .about("Pack, unpack, and search for RNC ProPack archives")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(Command::new("pack")
        .arg(arg!(-m --method <METHOD> "compression method").value_parser(["1","2"])
            .required(true))
        .arg(arg!(-k --key <KEY> "encryption key, 4 hex digits").value_parser(parse_key))
        .arg(arg!(-d --dict <SIZE> "dictionary size").value_parser(clap::value_parser!(usize)))
        .arg(arg!(--lock "lock the archive"))
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .about("pack a file"));

    main_cmd = main_cmd.subcommand(Command::new("unpack")
        .arg(arg!(-k --key <KEY> "encryption key, 4 hex digits").value_parser(parse_key))
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <PATH> "output path").required(true))
        .about("unpack a file"));

    main_cmd = main_cmd.subcommand(Command::new("search")
        .arg(arg!(-k --key <KEY> "encryption key, 4 hex digits").value_parser(parse_key))
        .arg(arg!(-i --input <PATH> "input path").required(true))
        .arg(arg!(-o --output <DIR> "extract archives into this directory"))
        .about("search a file for archives"));

    let matches = main_cmd.get_matches();

    if let Some(cmd) = matches.subcommand_matches("pack") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let method = match cmd.get_one::<String>("method").expect(RCH).as_str() {
            "1" => Method::Huffman,
            _ => Method::Fast
        };
        let opt = Options {
            method,
            dict_size: *cmd.get_one::<usize>("dict").unwrap_or(&0),
            key: *cmd.get_one::<u16>("key").unwrap_or(&0),
            lock: cmd.get_flag("lock"),
            ..STD_OPTIONS
        };
        if !ok_to_overwrite(path_out) {
            eprintln!("abort operation");
            return Ok(());
        }
        let mut in_file = std::fs::File::open(path_in)?;
        let mut out_file = std::fs::OpenOptions::new().write(true).truncate(false).create(true).open(path_out)?;
        let (in_size,out_size) = rnc::pack(&mut in_file,&mut out_file,&opt)?;
        out_file.set_len(out_size)?;
        eprintln!("packed {} into {}",in_size,out_size);
    }

    if let Some(cmd) = matches.subcommand_matches("unpack") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let path_out = cmd.get_one::<String>("output").expect(RCH);
        let opt = Options {
            key: *cmd.get_one::<u16>("key").unwrap_or(&0),
            ..STD_OPTIONS
        };
        if !ok_to_overwrite(path_out) {
            eprintln!("abort operation");
            return Ok(());
        }
        let mut in_file = std::fs::File::open(path_in)?;
        let mut out_file = std::fs::OpenOptions::new().write(true).truncate(false).create(true).open(path_out)?;
        let (in_size,out_size) = rnc::unpack(&mut in_file,&mut out_file,&opt)?;
        out_file.set_len(out_size)?;
        eprintln!("unpacked {} into {}",in_size,out_size);
    }

    if let Some(cmd) = matches.subcommand_matches("search") {
        let path_in = cmd.get_one::<String>("input").expect(RCH);
        let opt = Options {
            key: *cmd.get_one::<u16>("key").unwrap_or(&0),
            ..STD_OPTIONS
        };
        let buf = std::fs::read(path_in)?;
        let found = match cmd.get_one::<String>("output") {
            Some(dir) => {
                std::fs::create_dir_all(dir)?;
                rnc::search_and_save(&buf,&opt,std::path::Path::new(dir))?
            },
            None => rnc::search(&buf,&opt,false)?
        };
        for f in &found {
            println!("{:06X} packed {} unpacked {}",f.offset,f.packed_size,f.unpacked_size);
        }
        eprintln!("found {} archives",found.len());
    }

    Ok(())
}
