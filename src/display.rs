//! ST7789 panel renderer.
//!
//! Consumes a [`ViewModel`] and draws it line by line: clear to black, then
//! each line top to bottom with a fixed 12 px gap below the glyphs. The
//! panel is mounted upside down in the case, hence the fixed 180° rotation.

use anyhow::{Context, Result};
use display_interface_spi::SPIInterfaceNoCS;
use embedded_graphics::{
    mono_font::{ascii::FONT_10X20, MonoTextStyle},
    pixelcolor::Rgb565,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use linux_embedded_hal::{
    spidev::{self, SpiModeFlags, SpidevOptions},
    sysfs_gpio::{Direction, Pin},
    Delay, Spidev, SysfsPin,
};
use mipidsi::{models::ST7789, Builder, Orientation};

use crate::config::Config;
use crate::view::{LineColor, ViewModel};

const WIDTH: u16 = 240;
const HEIGHT: u16 = 240;
const SPI_SPEED_HZ: u32 = 24_000_000;

/// First line starts slightly above the edge, matching the panel layout.
const TOP: i32 = -2;
/// Gap between the bottom of one line's glyphs and the next line.
const LINE_SPACING: i32 = 12;

/// The physical panel.
pub struct Display {
    panel: mipidsi::Display<SPIInterfaceNoCS<Spidev, SysfsPin>, ST7789, SysfsPin>,
}

impl Display {
    /// Open the SPI bus, claim the control pins and initialize the panel.
    /// Any failure here is fatal at startup.
    pub fn new(config: &Config) -> Result<Self> {
        // The embedded-hal wrappers drive the panel; the raw handles inside
        // them do the one-time device setup.
        let mut bus = spidev::Spidev::open(&config.spi_device)
            .with_context(|| format!("opening SPI device {}", config.spi_device))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(SPI_SPEED_HZ)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        bus.configure(&options).context("configuring SPI")?;
        let spi = Spidev(bus);

        let dc = SysfsPin(Pin::new(config.dc_pin));
        init_output_pin(&dc).context("initializing D/C pin")?;

        let backlight = SysfsPin(Pin::new(config.backlight_pin));
        init_output_pin(&backlight).context("initializing backlight pin")?;
        backlight.0.set_value(1).context("enabling backlight")?;

        let mut delay = Delay {};
        let di = SPIInterfaceNoCS::new(spi, dc);
        let panel = Builder::st7789(di)
            .with_display_size(WIDTH, HEIGHT)
            .with_orientation(Orientation::PortraitInverted(false))
            .init(&mut delay, None::<SysfsPin>)
            .map_err(|e| anyhow::anyhow!("display init failed: {:?}", e))?;

        tracing::info!("Display initialized on {}", config.spi_device);
        Ok(Self { panel })
    }

    /// Draw a full frame, clearing the previous one first.
    pub fn render(&mut self, view: &ViewModel) -> Result<()> {
        Rectangle::new(Point::zero(), Size::new(WIDTH.into(), HEIGHT.into()))
            .into_styled(PrimitiveStyle::with_fill(Rgb565::BLACK))
            .draw(&mut self.panel)
            .map_err(|_| anyhow::anyhow!("Draw error"))?;

        let advance = FONT_10X20.character_size.height as i32 + LINE_SPACING;
        let mut y = TOP;
        for line in &view.lines {
            let style = MonoTextStyle::new(&FONT_10X20, rgb_of(line.color));
            Text::with_baseline(&line.text, Point::new(0, y), style, Baseline::Top)
                .draw(&mut self.panel)
                .map_err(|_| anyhow::anyhow!("Draw error"))?;
            y += advance;
        }
        Ok(())
    }
}

fn rgb_of(color: LineColor) -> Rgb565 {
    match color {
        LineColor::White => Rgb565::WHITE,
        LineColor::Blue => Rgb565::BLUE,
        LineColor::Yellow => Rgb565::YELLOW,
        LineColor::Green => Rgb565::GREEN,
        LineColor::Red => Rgb565::RED,
    }
}

fn init_output_pin(pin: &SysfsPin) -> Result<()> {
    pin.0.export()?;
    // sysfs needs a moment between export and direction change
    std::thread::sleep(std::time::Duration::from_millis(10));
    pin.0.set_direction(Direction::Out)?;
    pin.0.set_value(0)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedded_hal::blocking::spi::Write;
    use embedded_hal::digital::v2::OutputPin;

    fn assert_driver_bounds<S: Write<u8>, P: OutputPin>() {}

    #[test]
    fn test_hal_wrappers_satisfy_driver_bounds() {
        // The panel stack needs the embedded-hal newtype wrappers; the raw
        // sysfs/spidev handles implement none of these traits.
        assert_driver_bounds::<Spidev, SysfsPin>();
    }
}
