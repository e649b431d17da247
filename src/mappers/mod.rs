/*
Module: mappers

Dispatcher module: declares mapper submodules and re-exports their public
types. The factory in `crate::mapper` maps iNES numbers to these types.

Implemented:
- MMC1 (Mapper 1)
- UxROM (Mapper 2)
- CNROM (Mapper 3)
- MMC3 (Mapper 4)
- AxROM (Mapper 7)
- MMC2 (Mapper 9)
- GxROM (Mapper 66)
- Sunsoft FME-7 (Mapper 69)
- Bandai 74161/7432 (Mapper 152)
*/

pub mod axrom;
pub mod bandai152;
pub mod cnrom;
pub mod fme7;
pub mod gxrom;
pub mod mmc1;
pub mod mmc2;
pub mod mmc3;
pub mod uxrom;

pub use axrom::Axrom;
pub use bandai152::Bandai152;
pub use cnrom::Cnrom;
pub use fme7::Fme7;
pub use gxrom::Gxrom;
pub use mmc1::Mmc1;
pub use mmc2::Mmc2;
pub use mmc3::Mmc3;
pub use uxrom::Uxrom;
