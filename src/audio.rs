use std::path::PathBuf;
use std::process::Command;
use std::thread;

use crate::notify::ToastSound;

/// The three samples the app ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sound {
    Ding,
    PleaseValidate,
    AlreadyTaken,
}

impl Sound {
    fn file_name(self) -> &'static str {
        match self {
            Sound::Ding => "ding.mp3",
            Sound::PleaseValidate => "please_validate.mp3",
            Sound::AlreadyTaken => "already_taken.mp3",
        }
    }
}

impl From<ToastSound> for Sound {
    fn from(sound: ToastSound) -> Self {
        match sound {
            ToastSound::Ding => Sound::Ding,
            ToastSound::PleaseValidate => Sound::PleaseValidate,
        }
    }
}

/// paplay expects 0-65536; the config stores 0-100.
fn paplay_volume(percent: u8) -> u32 {
    u32::from(percent.min(100)) * 65536 / 100
}

/// Installed sample directory, with a development fallback next to the
/// working directory.
fn sound_path(sound: Sound) -> Option<PathBuf> {
    let installed = dirs::data_dir()
        .map(|d| d.join("pharma-counter/sounds").join(sound.file_name()));
    if let Some(path) = installed {
        if path.exists() {
            return Some(path);
        }
    }
    let local = PathBuf::from("assets/sounds").join(sound.file_name());
    local.exists().then_some(local)
}

/// Fire-and-forget sample playback through PulseAudio/PipeWire.
///
/// Playback failures only cost the sound, so they are logged and swallowed;
/// the wait happens on a throwaway thread to avoid leaving zombies.
#[derive(Debug, Clone, Copy)]
pub struct AudioPlayer {
    volume: u8,
}

impl AudioPlayer {
    pub fn new(volume: u8) -> Self {
        AudioPlayer { volume }
    }

    pub fn play(&self, sound: Sound) {
        if self.volume == 0 {
            return;
        }
        let Some(path) = sound_path(sound) else {
            tracing::debug!("sample {:?} not installed, staying silent", sound);
            return;
        };
        let volume = paplay_volume(self.volume);
        let spawned = thread::Builder::new().name("audio".into()).spawn(move || {
            let status = Command::new("paplay")
                .arg(format!("--volume={volume}"))
                .arg(&path)
                .status();
            if let Err(e) = status {
                tracing::debug!("paplay failed: {e}");
            }
        });
        if spawned.is_err() {
            tracing::debug!("could not spawn audio thread");
        }
    }
}
