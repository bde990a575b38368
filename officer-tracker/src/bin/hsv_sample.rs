//! Offline calibration helper: given a raw RGB8 frame dump and a pixel
//! rectangle, prints the HSV-in-range fraction `HSVConfirmationStrategy`
//! would compute for that box against a candidate HSV bound. Non-interactive
//! counterpart to the original rig's HSV calibration GUI, which stays out
//! of scope as an external collaborator.

use anyhow::{bail, Context, Result};

use officer_tracker::locator::color::{hsv_in_range_fraction, HsvBound};

fn usage() -> ! {
    eprintln!(
        "usage: officer-tracker-hsv-sample <raw-rgb8-file> <width> <height> \\\n  \
         <x0> <y0> <x1> <y1> <min_h> <min_s> <min_v> <max_h> <max_s> <max_v>"
    );
    std::process::exit(1);
}

fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() != 13 {
        usage();
    }

    let path = &args[0];
    let width: u32 = args[1].parse().context("width must be an integer")?;
    let height: u32 = args[2].parse().context("height must be an integer")?;
    let x0: u32 = args[3].parse()?;
    let y0: u32 = args[4].parse()?;
    let x1: u32 = args[5].parse()?;
    let y1: u32 = args[6].parse()?;
    let min_hsv = HsvBound {
        h: args[7].parse()?,
        s: args[8].parse()?,
        v: args[9].parse()?,
    };
    let max_hsv = HsvBound {
        h: args[10].parse()?,
        s: args[11].parse()?,
        v: args[12].parse()?,
    };

    let pixels = std::fs::read(path).with_context(|| format!("failed to read {path}"))?;
    let expected_len = width as usize * height as usize * 3;
    if pixels.len() != expected_len {
        bail!(
            "frame file is {} bytes, expected {} for {width}x{height} RGB8",
            pixels.len(),
            expected_len
        );
    }

    let fraction = hsv_in_range_fraction(&pixels, width, ((x0, y0), (x1, y1)), min_hsv, max_hsv);
    println!("{fraction:.4}");

    Ok(())
}
