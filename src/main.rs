use rust_evg::card::EvgCard;
use rust_evg::output::OutputKind;
use rustevg_hal::config::CardLayout;
use rustevg_hal::sim::SimWindow;
use std::env;

fn usage(program: &str) -> ! {
    eprintln!(
        "Usage: {program} <layout.toml> <fp|univ> <id> <code>\n\
         \n\
         Routes a mapping code to one output of a simulated event generator\n\
         and prints the register content read back.\n\
         \n\
         Example:\n\
           {program} config/evg_mrm.toml fp 3 0x2a\n\
         \n\
         Set RUST_LOG=debug to see register traffic."
    );
    std::process::exit(1)
}

fn parse_kind(s: &str) -> Option<OutputKind> {
    match s {
        "fp" | "front_panel" => Some(OutputKind::FrontPanel),
        "univ" | "universal" => Some(OutputKind::Universal),
        _ => None,
    }
}

fn parse_u32(s: &str) -> Option<u32> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

fn main() {
    env_logger::init();

    let mut args = env::args();
    let program = args.next().unwrap_or_else(|| "rust_evg".to_string());
    let args: Vec<String> = args.collect();
    let [layout_path, kind, id, code] = args.as_slice() else {
        usage(&program);
    };

    let kind = parse_kind(kind).unwrap_or_else(|| {
        eprintln!("Unknown output kind: {kind}");
        usage(&program)
    });
    let id = parse_u32(id).unwrap_or_else(|| {
        eprintln!("Invalid output id: {id}");
        usage(&program)
    });
    let code = parse_u32(code)
        .and_then(|c| u16::try_from(c).ok())
        .unwrap_or_else(|| {
            eprintln!("Invalid mapping code: {code}");
            usage(&program)
        });

    let layout = CardLayout::from_file(layout_path).unwrap_or_else(|e| {
        eprintln!("Failed to load layout: {e}");
        std::process::exit(1)
    });
    let window = SimWindow::new(layout.window_size);
    let mut card = EvgCard::new(&window, &layout).unwrap_or_else(|e| {
        eprintln!("Failed to bind outputs: {e}");
        std::process::exit(1)
    });

    if let Err(e) = card.set_out_map(kind, id, code) {
        eprintln!("{e}");
        std::process::exit(2);
    }

    match card.read_out_map(kind, id) {
        Ok(value) => println!("{kind} output {id}: {value:#06x}"),
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(2);
        }
    }
}
