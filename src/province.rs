//! First-level administrative divisions of South Korea and their statistical codes.

use crate::error::GeotifyError;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Province {
    Seoul,
    Busan,
    Daegu,
    Incheon,
    Gwangju,
    Daejeon,
    Ulsan,
    Sejong,
    Gyeonggi,
    Gangwon,
    Chungbuk,
    Chungnam,
    Jeonbuk,
    Jeonnam,
    Gyeongbuk,
    Gyeongnam,
    Jeju,
}

impl Province {
    pub const ALL: [Province; 17] = [
        Province::Seoul,
        Province::Busan,
        Province::Daegu,
        Province::Incheon,
        Province::Gwangju,
        Province::Daejeon,
        Province::Ulsan,
        Province::Sejong,
        Province::Gyeonggi,
        Province::Gangwon,
        Province::Chungbuk,
        Province::Chungnam,
        Province::Jeonbuk,
        Province::Jeonnam,
        Province::Gyeongbuk,
        Province::Gyeongnam,
        Province::Jeju,
    ];

    /// Two-digit code used as the region-code filter.
    pub fn code(&self) -> &'static str {
        match self {
            Province::Seoul => "11",
            Province::Busan => "21",
            Province::Daegu => "22",
            Province::Incheon => "23",
            Province::Gwangju => "24",
            Province::Daejeon => "25",
            Province::Ulsan => "26",
            Province::Sejong => "29",
            Province::Gyeonggi => "31",
            Province::Gangwon => "32",
            Province::Chungbuk => "33",
            Province::Chungnam => "34",
            Province::Jeonbuk => "35",
            Province::Jeonnam => "36",
            Province::Gyeongbuk => "37",
            Province::Gyeongnam => "38",
            Province::Jeju => "39",
        }
    }

    pub fn korean_name(&self) -> &'static str {
        match self {
            Province::Seoul => "서울특별시",
            Province::Busan => "부산광역시",
            Province::Daegu => "대구광역시",
            Province::Incheon => "인천광역시",
            Province::Gwangju => "광주광역시",
            Province::Daejeon => "대전광역시",
            Province::Ulsan => "울산광역시",
            Province::Sejong => "세종특별자치시",
            Province::Gyeonggi => "경기도",
            Province::Gangwon => "강원특별자치도",
            Province::Chungbuk => "충청북도",
            Province::Chungnam => "충청남도",
            Province::Jeonbuk => "전북특별자치도",
            Province::Jeonnam => "전라남도",
            Province::Gyeongbuk => "경상북도",
            Province::Gyeongnam => "경상남도",
            Province::Jeju => "제주특별자치도",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            Province::Seoul => &["seoul", "서울"],
            Province::Busan => &["busan", "부산"],
            Province::Daegu => &["daegu", "대구"],
            Province::Incheon => &["incheon", "인천"],
            Province::Gwangju => &["gwangju", "광주"],
            Province::Daejeon => &["daejeon", "대전"],
            Province::Ulsan => &["ulsan", "울산"],
            Province::Sejong => &["sejong", "세종"],
            Province::Gyeonggi => &["gyeonggi", "gyeonggi-do", "경기"],
            Province::Gangwon => &["gangwon", "gangwon-do", "강원", "강원도"],
            Province::Chungbuk => &["chungbuk", "chungcheongbuk-do", "충북"],
            Province::Chungnam => &["chungnam", "chungcheongnam-do", "충남"],
            Province::Jeonbuk => &["jeonbuk", "jeollabuk-do", "전북", "전라북도"],
            Province::Jeonnam => &["jeonnam", "jeollanam-do", "전남"],
            Province::Gyeongbuk => &["gyeongbuk", "gyeongsangbuk-do", "경북"],
            Province::Gyeongnam => &["gyeongnam", "gyeongsangnam-do", "경남"],
            Province::Jeju => &["jeju", "jeju-do", "제주", "제주도"],
        }
    }
}

impl fmt::Display for Province {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.korean_name())
    }
}

impl FromStr for Province {
    type Err = GeotifyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase();
        Province::ALL
            .iter()
            .copied()
            .find(|p| {
                p.code() == needle
                    || p.korean_name() == needle
                    || p.aliases().iter().any(|a| *a == needle)
            })
            .ok_or_else(|| GeotifyError::InvalidConfig(format!("unknown province '{}'", s)))
    }
}
