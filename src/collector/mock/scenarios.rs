//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc/mdstat` reports for the array
//! states the collector has to handle.

use super::filesystem::MockFs;

/// Location of the status report in every scenario.
pub const MDSTAT_PATH: &str = "/proc/mdstat";

impl MockFs {
    /// A single clean two-disk mirror.
    pub fn healthy_mirror() -> Self {
        let mut fs = Self::new();
        fs.add_file(
            MDSTAT_PATH,
            "\
Personalities : [raid1]
md0 : active raid1 sda1[0] sdb1[1]
      1953511936 blocks [2/2] [UU]

unused devices: <none>
",
        );
        fs
    }

    /// A mirror rebuilding onto a replacement disk.
    pub fn recovering_mirror() -> Self {
        let mut fs = Self::new();
        fs.add_file(
            MDSTAT_PATH,
            "\
Personalities : [raid1]
md0 : active raid1 sdb1[2] sda1[0]
      1953511936 blocks [2/1] [U_]
      [========>............]  recovery = 45.0% (878780416/1953511936) finish=92.3min speed=194048K/sec

unused devices: <none>
",
        );
        fs
    }

    /// Several arrays: bitmap line, a resync in progress, an inactive array
    /// and a raid5 with a long status line.
    pub fn mixed_arrays() -> Self {
        let mut fs = Self::new();
        fs.add_file(
            MDSTAT_PATH,
            "\
Personalities : [linear] [raid0] [raid1] [raid6] [raid5] [raid4] [raid10]
md3 : active raid6 sda1[8] sdh1[7] sdg1[6] sdf1[5] sde1[11] sdd1[3] sdc1[10] sdb1[9]
      5853468288 blocks super 1.2 level 6, 64k chunk, algorithm 2 [8/8] [UUUUUUUU]
      bitmap: 0/8 pages [0KB], 65536KB chunk

md127 : active raid1 sdi2[0] sdj2[1]
      312319552 blocks [2/2] [UU]
      [==>..................]  resync = 12.4% (38729344/312319552) finish=40.5min speed=112384K/sec

md0 : inactive raid1 sdk1[0] sdl1[1]
      248896 blocks [2/2] [UU]

md4 : active raid5 sdm1[0] sdn1[1] sdo1[3]
      4883411968 blocks super 1.2 level 5, 512k chunk, algorithm 2 [3/3] [UUU]
      bitmap: 2/19 pages [8KB], 65536KB chunk
      [=>...................]  recovery = 8.5% (207771648/2441705984) finish=207.1min speed=179710K/sec

unused devices: <none>
",
        );
        fs
    }

    /// A host without the md driver loaded.
    pub fn without_mdstat() -> Self {
        Self::new()
    }
}
