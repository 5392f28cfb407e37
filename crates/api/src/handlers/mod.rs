pub mod eeg;
