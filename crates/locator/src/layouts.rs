//! Install layout tables.
//!
//! Supporting a new layout means adding a row here; the search code only
//! walks these tables in order.

use std::path::{Path, PathBuf};

/// Directory a template is relative to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Base {
    /// `$HOME`.
    Home,
    /// `$XDG_DATA_HOME` (usually `~/.local/share`).
    XdgData,
}

/// A candidate root directory, relative to a [`Base`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RootTemplate {
    pub label: &'static str,
    pub base: Base,
    pub rel: &'static str,
}

/// A directory under which Wine prefixes live at a bounded depth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeRoot {
    pub label: &'static str,
    pub base: Base,
    pub rel: &'static str,
    /// Directory levels below `rel` that are searched for prefixes.
    pub depth: usize,
}

/// A game whose client log may be located.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GameInstall {
    pub name: &'static str,
    /// Steam app ID, also the Proton `compatdata` directory name.
    pub app_id: u32,
    /// Install directory name, both under `steamapps/common` and under the
    /// standalone installer's publisher directory.
    pub dir: &'static str,
}

pub const GAMES: &[GameInstall] = &[
    GameInstall {
        name: "Path of Exile",
        app_id: 238960,
        dir: "Path of Exile",
    },
    GameInstall {
        name: "Path of Exile 2",
        app_id: 2694490,
        dir: "Path of Exile 2",
    },
];

/// Steam client roots, in preference order.
pub const STEAM_ROOTS: &[RootTemplate] = &[
    RootTemplate {
        label: "steam",
        base: Base::Home,
        rel: ".steam/steam",
    },
    RootTemplate {
        label: "steam-xdg",
        base: Base::XdgData,
        rel: "Steam",
    },
    RootTemplate {
        label: "steam-flatpak",
        base: Base::Home,
        rel: ".var/app/com.valvesoftware.Steam/.local/share/Steam",
    },
    RootTemplate {
        label: "steam-flatpak-legacy",
        base: Base::Home,
        rel: ".var/app/com.valvesoftware.Steam/.steam/steam",
    },
    RootTemplate {
        label: "steam-snap",
        base: Base::Home,
        rel: "snap/steam/common/.local/share/Steam",
    },
];

/// Roots probed for Wine prefixes created by other launchers.
pub const PROBE_ROOTS: &[ProbeRoot] = &[
    ProbeRoot {
        label: "wine",
        base: Base::Home,
        rel: ".wine",
        depth: 0,
    },
    ProbeRoot {
        label: "lutris",
        base: Base::Home,
        rel: "Games",
        depth: 2,
    },
    ProbeRoot {
        label: "heroic",
        base: Base::Home,
        rel: "Games/Heroic/Prefixes",
        depth: 2,
    },
    ProbeRoot {
        label: "bottles",
        base: Base::XdgData,
        rel: "bottles/bottles",
        depth: 1,
    },
    ProbeRoot {
        label: "bottles-flatpak",
        base: Base::Home,
        rel: ".var/app/com.usebottles.bottles/data/bottles/bottles",
        depth: 1,
    },
    ProbeRoot {
        label: "lutris-prefixes",
        base: Base::XdgData,
        rel: "lutris/prefixes",
        depth: 1,
    },
];

/// Depth at which Proton prefixes sit under `steamapps/compatdata`.
pub const COMPATDATA_DEPTH: usize = 1;

/// Log file location inside a game install directory.
pub const LOG_REL: &str = "logs/Client.txt";

/// Publisher directories used by the standalone Windows installer.
pub const STANDALONE_DIRS: &[&str] = &[
    "drive_c/Program Files (x86)/Grinding Gear Games",
    "drive_c/Program Files/Grinding Gear Games",
];

/// Steam-for-Windows library installed inside a Wine prefix.
pub const WINE_STEAM_COMMON: &[&str] = &[
    "drive_c/Program Files (x86)/Steam/steamapps/common",
    "drive_c/Program Files/Steam/steamapps/common",
];

/// Candidate log paths for `game` within one Steam library.
///
/// Covers the Steam install itself and the standalone client installed
/// into the game's Proton prefix.
pub fn library_candidates(library: &Path, game: &GameInstall) -> Vec<PathBuf> {
    let steamapps = library.join("steamapps");
    let mut out = vec![steamapps.join("common").join(game.dir).join(LOG_REL)];
    let pfx = steamapps
        .join("compatdata")
        .join(game.app_id.to_string())
        .join("pfx");
    out.extend(
        STANDALONE_DIRS
            .iter()
            .map(|d| pfx.join(d).join(game.dir).join(LOG_REL)),
    );
    out
}

/// Candidate log paths for `game` inside a Wine prefix.
pub fn prefix_candidates(prefix: &Path, game: &GameInstall) -> Vec<PathBuf> {
    STANDALONE_DIRS
        .iter()
        .chain(WINE_STEAM_COMMON)
        .map(|d| prefix.join(d).join(game.dir).join(LOG_REL))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn library_candidates_order() {
        let c = library_candidates(Path::new("/steam"), &GAMES[0]);
        assert_eq!(
            c[0],
            PathBuf::from("/steam/steamapps/common/Path of Exile/logs/Client.txt")
        );
        assert_eq!(
            c[1],
            PathBuf::from(
                "/steam/steamapps/compatdata/238960/pfx/drive_c/Program Files (x86)/Grinding Gear Games/Path of Exile/logs/Client.txt"
            )
        );
        assert_eq!(c.len(), 1 + STANDALONE_DIRS.len());
    }

    #[test]
    fn prefix_candidates_cover_standalone_and_wine_steam() {
        let c = prefix_candidates(Path::new("/pfx"), &GAMES[1]);
        assert_eq!(c.len(), STANDALONE_DIRS.len() + WINE_STEAM_COMMON.len());
        assert!(c.contains(&PathBuf::from(
            "/pfx/drive_c/Program Files (x86)/Steam/steamapps/common/Path of Exile 2/logs/Client.txt"
        )));
    }

    #[test]
    fn templates_are_relative() {
        for root in STEAM_ROOTS {
            assert!(!Path::new(root.rel).is_absolute(), "{}", root.label);
        }
        for root in PROBE_ROOTS {
            assert!(!Path::new(root.rel).is_absolute(), "{}", root.label);
        }
    }
}
